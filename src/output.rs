use crate::error::Result;
use crate::types::RunSummary;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Environment variable naming the CI step-output file.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// Appends the run counters as `key=value` lines to the step-output file.
pub fn append_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(summary.to_output_lines().as_bytes())?;
    Ok(())
}

/// Writes the summary to `$GITHUB_OUTPUT` when it is set. Returns whether
/// anything was written.
pub fn write_github_output(summary: &RunSummary) -> Result<bool> {
    match std::env::var_os(GITHUB_OUTPUT_ENV) {
        Some(path) if !path.is_empty() => {
            append_summary(Path::new(&path), summary)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_appends_after_existing_outputs() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "previous_step=ok\n").unwrap();

        let summary = RunSummary { total_found: 14, inserted: 9, duplicates: 5 };
        append_summary(file.path(), &summary).unwrap();

        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "previous_step=ok\nevents_found=14\nevents_inserted=9\nduplicates_skipped=5\n"
        );
    }

    #[test]
    fn test_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_output");

        append_summary(&path, &RunSummary::default()).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "events_found=0\nevents_inserted=0\nduplicates_skipped=0\n"
        );
    }
}
