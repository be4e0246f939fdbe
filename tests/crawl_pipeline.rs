use anyhow::Result;
use catchdm_crawler::app::ports::RecordStorePort;
use catchdm_crawler::app::{CrawlerDeps, Orchestrator, RunState};
use catchdm_crawler::clock::FixedClock;
use catchdm_crawler::config::Config;
use catchdm_crawler::infra::{BrowserlessFetcher, ClaudeExtractor, SupabaseRecordStore, TokioPacer};
use catchdm_crawler::output::append_summary;
use catchdm_crawler::storage::InMemoryRecordStore;
use catchdm_crawler::types::RunSummary;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_0: &str = "https://www.catchdesmoines.com/events/";
const LISTING_1: &str = "https://www.catchdesmoines.com/events/?skip=12&bounds=false&view=grid&sort=date";
const JAZZ_DETAIL: &str = "https://www.catchdesmoines.com/event/jazz-night/55001/";

fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.crawl.page_delay_ms = 0;
    config.crawl.detail_delay_ms = 0;
    config.extractor.base_url = Some(server.uri());
    config
}

fn claude_reply(events: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": events.to_string() }],
        "stop_reason": "end_turn"
    }))
}

async fn mount_render(server: &MockServer, url: &str, html: &str) {
    Mock::given(method("POST"))
        .and(path("/content"))
        .and(body_partial_json(json!({ "url": url })))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

fn deps(server: &MockServer, store: Arc<dyn RecordStorePort>) -> Result<CrawlerDeps> {
    let config = test_config(server);
    Ok(CrawlerDeps {
        fetcher: Arc::new(BrowserlessFetcher::new(&server.uri(), None)?),
        extractor: Arc::new(ClaudeExtractor::new("sk-ant-test", &config.extractor)),
        store,
        pacer: Arc::new(TokioPacer),
        clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 10, 19, 17, 0, 0).unwrap())),
    })
}

#[tokio::test]
async fn test_full_run_against_http_services() -> Result<()> {
    let server = MockServer::start().await;

    mount_render(
        &server,
        LISTING_0,
        r#"<html><head><script>track()</script></head><body><div class="card">jazz-night-card</div></body></html>"#,
    )
    .await;
    mount_render(&server, LISTING_1, "<html><body><p>no-results</p></body></html>").await;
    mount_render(
        &server,
        JAZZ_DETAIL,
        r#"<html><body>
            <a href="https://www.facebook.com/hoyt">Facebook</a>
            <a href="https://hoytsherman.org/jazz">Visit Website</a>
        </body></html>"#,
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_string_contains("jazz-night-card"))
        .respond_with(claude_reply(json!([
            {
                "title": "Jazz Night",
                "description": "Live jazz downtown",
                "date": "2026-11-07 20:00:00",
                "venue": "Hoyt Sherman",
                "category": "Music",
                "price": "$25",
                "detail_url": "/event/jazz-night/55001/"
            },
            { "title": "Art Walk", "date": "2026-11-06", "venue": "East Village" },
            { "title": "Last Week's Show", "date": "2026-10-12 20:00:00", "venue": "Wooly's" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_string_contains("no-results"))
        .respond_with(claude_reply(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .and(query_param("title", "ilike.Art Walk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 41 }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/events"))
        .and(body_partial_json(json!({
            "title": "Jazz Night",
            "venue": "Hoyt Sherman",
            "source_url": "https://hoytsherman.org/jazz",
            "event_timezone": "America/Chicago",
            "event_start_utc": "2026-11-08T02:00:00+00:00"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 42 }])))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(SupabaseRecordStore::new(&server.uri(), "service", "events"));
    let orchestrator = Orchestrator::new(deps(&server, store)?, &test_config(&server), false)?;

    let outcome = orchestrator.run(3).await;
    assert_eq!(outcome.state, RunState::Done);
    assert_eq!(outcome.summary, RunSummary { total_found: 3, inserted: 1, duplicates: 1 });

    let output = tempfile::NamedTempFile::new()?;
    append_summary(output.path(), &outcome.summary)?;
    assert_eq!(
        std::fs::read_to_string(output.path())?,
        "events_found=3\nevents_inserted=1\nduplicates_skipped=1\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_unreachable_listing_aborts_run() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/content"))
        .respond_with(ResponseTemplate::new(500).set_body_string("browser crashed"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(claude_reply(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryRecordStore::new());
    let orchestrator = Orchestrator::new(deps(&server, store.clone())?, &test_config(&server), false)?;

    let outcome = orchestrator.run(5).await;
    assert!(outcome.is_aborted());
    assert_eq!(outcome.summary, RunSummary::default());
    assert_eq!(store.insert_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_dry_run_skips_store_entirely() -> Result<()> {
    let server = MockServer::start().await;
    mount_render(&server, LISTING_0, "<div>art-walk-card</div>").await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(claude_reply(json!([
            { "title": "Art Walk", "date": "2026-11-06", "venue": "East Village" }
        ])))
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryRecordStore::with_existing(&[("Art Walk", "East Village")]));
    let orchestrator = Orchestrator::new(deps(&server, store.clone())?, &test_config(&server), true)?;

    let outcome = orchestrator.run(1).await;
    assert_eq!(outcome.summary, RunSummary { total_found: 1, inserted: 1, duplicates: 0 });
    assert_eq!(store.insert_calls(), 0);
    assert_eq!(store.len(), 1);
    Ok(())
}
