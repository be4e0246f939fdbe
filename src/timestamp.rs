use crate::constants::DEFAULT_EVENT_HOUR;
use crate::error::{CrawlerError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static STRICT_DATETIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap());
static STRICT_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static WEEKDAY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)[a-z]*\.?,?\s+").unwrap()
});
static ORDINAL_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").unwrap());
static MONTH_ABBREVIATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)(?:\.|t\.?)(\s|$)").unwrap()
});
static MERIDIEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(:\d{2})?\s*([ap])\.?\s?m\.?(\s|$)").unwrap());
static AT_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+(at|@)\s+").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d %Y %I:%M %p",
    "%d %B %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%B %d %Y", "%d %B %Y"];

/// Formats without a year; the year is taken from the reference date.
const YEARLESS_DATETIME_FORMATS: &[&str] = &["%B %d %I:%M %p"];
const YEARLESS_DATE_FORMATS: &[&str] = &["%B %d"];

/// Converts loosely formatted venue-local date strings into UTC instants.
#[derive(Debug, Clone, Copy)]
pub struct TimestampNormalizer {
    tz: Tz,
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        Self { tz: chrono_tz::America::Chicago }
    }
}

impl TimestampNormalizer {
    pub fn new(timezone: &str) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|e| CrawlerError::Config(format!("Unknown timezone '{timezone}': {e}")))?;
        Ok(Self { tz })
    }

    /// America/Chicago, the venue-local civil time.
    pub fn central() -> Self {
        Self::default()
    }

    pub fn timezone_name(&self) -> &'static str {
        self.tz.name()
    }

    /// Today's calendar date in the reference timezone.
    pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Parses `raw` and returns the absolute instant, or `None` when the
    /// string is not understood or names a non-existent local time.
    ///
    /// `today` anchors forms that omit the year.
    pub fn normalize(&self, raw: &str, today: NaiveDate) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if STRICT_DATETIME.is_match(raw) {
            let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok()?;
            return self.localize(naive);
        }
        if STRICT_DATE.is_match(raw) {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
            return self.localize(default_evening(date)?);
        }

        self.parse_general(raw, today)
    }

    fn parse_general(&self, raw: &str, today: NaiveDate) -> Option<DateTime<Utc>> {
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
            return Some(with_offset.with_timezone(&Utc));
        }

        let cleaned = clean(raw);

        if let Some(naive) = first_datetime(&cleaned, DATETIME_FORMATS) {
            return self.localize(naive);
        }
        if let Some(date) = first_date(&cleaned, DATE_FORMATS) {
            return self.localize(default_evening(date)?);
        }

        // "October 25 7:30 PM": assume the next occurrence on or after today
        let with_year = format!("{} {}", cleaned, today.year());
        let yearless = |candidate: NaiveDateTime| {
            if candidate.date() < today {
                candidate.with_year(today.year() + 1)
            } else {
                Some(candidate)
            }
        };
        let formats_with_year = |formats: &[&str]| -> Vec<String> {
            formats.iter().map(|f| format!("{f} %Y")).collect()
        };
        let dt_formats = formats_with_year(YEARLESS_DATETIME_FORMATS);
        let dt_refs: Vec<&str> = dt_formats.iter().map(String::as_str).collect();
        if let Some(naive) = first_datetime(&with_year, &dt_refs) {
            return self.localize(yearless(naive)?);
        }
        let d_formats = formats_with_year(YEARLESS_DATE_FORMATS);
        let d_refs: Vec<&str> = d_formats.iter().map(String::as_str).collect();
        if let Some(date) = first_date(&with_year, &d_refs) {
            return self.localize(yearless(default_evening(date)?)?);
        }

        debug!(raw, "Unrecognized date format");
        None
    }

    /// Interprets a naive local time in the reference timezone. Fall-back
    /// ambiguity resolves to the earlier instant; spring-forward gaps fail.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }
}

fn default_evening(date: NaiveDate) -> Option<NaiveDateTime> {
    NaiveTime::from_hms_opt(DEFAULT_EVENT_HOUR, 0, 0).map(|t| date.and_time(t))
}

fn first_datetime(s: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
}

fn first_date(s: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats.iter().find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

/// Strips weekday prefixes, ordinal suffixes, "at" and abbreviation periods,
/// and rewrites "7:30pm" / "7 p.m." as "7:30 PM" / "7:00 PM".
fn clean(raw: &str) -> String {
    let s = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let s = WEEKDAY_PREFIX.replace(&s, "");
    let s = MONTH_ABBREVIATION.replace_all(&s, "$1$2");
    let s = ORDINAL_SUFFIX.replace_all(&s, "$1");
    let s = AT_SEPARATOR.replace_all(&s, " ");
    // chrono cannot parse %I %p without minutes
    let s = MERIDIEM.replace_all(&s, |caps: &regex::Captures| {
        let minutes = caps.get(2).map_or(":00", |m| m.as_str());
        format!("{}{} {}M{}", &caps[1], minutes, caps[3].to_ascii_uppercase(), &caps[4])
    });
    s.trim().to_string()
}
