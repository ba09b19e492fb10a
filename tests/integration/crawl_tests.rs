//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small site and run the full pipeline
//! end-to-end: HTTP extraction, frontier deduplication and both result sinks.

use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;
use trawler::config::{
    parse_config, ExtractorConfig, OutputConfig, OutputFormat, UserAgentConfig,
};
use trawler::crawler::{crawl, Coordinator, CrawlSettings, HttpExtractor};
use trawler::output::load_statistics;
use trawler::storage::{JsonLinesWriter, SqliteResultWriter};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn create_test_settings(budget: usize) -> CrawlSettings {
    CrawlSettings {
        pool_size: 2,
        batch_size: 2,
        fetch_budget: budget,
        false_positive_rate: 0.0001,
        poll_backoff: std::time::Duration::from_millis(1),
        persist_backoff: std::time::Duration::from_millis(1),
        progress_interval: 1,
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Serves a five-page site:
/// - `/` links everywhere, including a mailto and a JSON document
/// - `/page1` and `/page2` link back and forth, once through a tracking parameter
/// - `/data.json` is not HTML
/// - `/missing` is a 404
async fn start_test_site() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <p>Welcome home</p>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2#top">Page 2</a>
            <a href="/data.json">Data</a>
            <a href="/missing">Gone</a>
            <a href="mailto:test@example.com">Mail</a>
            </body></html>"#
        ),
    )
    .await;

    mount_html(
        &server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>
            <a href="/">Home</a>
            <a href="page2">Page 2</a>
            </body></html>"#
            .to_string(),
    )
    .await;

    mount_html(
        &server,
        "/page2",
        r#"<html><head><title>Page 2</title></head><body>
            <a href="/page1?utm_source=newsletter">Page 1 again</a>
            </body></html>"#
            .to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"ok":true}"#, "application/json"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    server
}

fn output_config(format: OutputFormat, path: &Path) -> OutputConfig {
    OutputConfig {
        format,
        path: path.to_string_lossy().into_owned(),
    }
}

#[tokio::test]
async fn test_full_crawl_into_sqlite() {
    let server = start_test_site().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("results.db");
    let output = output_config(OutputFormat::Sqlite, &db_path);

    let extractor = HttpExtractor::new(&create_test_user_agent(), &ExtractorConfig::default())
        .expect("Failed to build extractor");
    let coordinator = Coordinator::setup(
        create_test_settings(100),
        extractor,
        SqliteResultWriter::new(),
        &output,
    )
    .expect("Failed to set up coordinator");

    let report = coordinator
        .process([format!("{}/", server.uri())])
        .await
        .expect("Crawl failed");

    // Home, both pages, the JSON document and the 404
    assert_eq!(report.urls_attempted, 5);
    assert_eq!(report.results_fetched, 3);
    assert_eq!(report.failed_attempts(), 2);
    assert_eq!(report.persisted, 3);
    assert_eq!(report.write_failures, 0);

    let stats = load_statistics(&db_path).expect("Failed to read statistics");
    assert_eq!(stats.total_pages, 3);
    assert_eq!(stats.titled_pages, 3);
    // Home has 4 outlinks, page1 has 2, page2 has 1
    assert_eq!(stats.total_links, 7);
}

#[tokio::test]
async fn test_full_crawl_into_jsonl() {
    let server = start_test_site().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let out_path = dir.path().join("results.jsonl");
    let output = output_config(OutputFormat::Jsonl, &out_path);

    let extractor_config = ExtractorConfig {
        capture_text: true,
        ..ExtractorConfig::default()
    };
    let extractor = HttpExtractor::new(&create_test_user_agent(), &extractor_config)
        .expect("Failed to build extractor");
    let coordinator = Coordinator::setup(
        create_test_settings(100),
        extractor,
        JsonLinesWriter::new(),
        &output,
    )
    .expect("Failed to set up coordinator");

    let base = server.uri();
    let report = coordinator
        .process([format!("{}/", base)])
        .await
        .expect("Crawl failed");
    assert_eq!(report.persisted, 3);

    let contents = std::fs::read_to_string(&out_path).expect("Failed to read output");
    let records: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect();
    assert_eq!(records.len(), 3);

    let urls: BTreeSet<String> = records
        .iter()
        .map(|r| r["url"].as_str().unwrap().to_string())
        .collect();
    let expected: BTreeSet<String> = ["/", "/page1", "/page2"]
        .iter()
        .map(|p| format!("{}{}", base, p))
        .collect();
    assert_eq!(urls, expected);

    let home = records
        .iter()
        .find(|r| r["url"] == format!("{}/", base))
        .expect("Home page missing");
    assert_eq!(home["title"], "Home");
    assert!(home["text"].as_str().unwrap().contains("Welcome home"));

    // The fragment is stripped and the mailto link dropped
    let outlinks: Vec<&str> = home["outlinks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert!(outlinks.contains(&format!("{}/page2", base).as_str()));
    assert!(outlinks.iter().all(|link| !link.contains('#')));
    assert!(outlinks.iter().all(|link| !link.starts_with("mailto:")));

    // Every page fetched exactly once despite the cycles
    let requests = server.received_requests().await.expect("Recording disabled");
    for route in ["/", "/page1", "/page2"] {
        let hits = requests.iter().filter(|r| r.url.path() == route).count();
        assert_eq!(hits, 1, "{} requested {} times", route, hits);
    }
}

#[tokio::test]
async fn test_budget_bounds_persisted_pages() {
    let server = start_test_site().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let out_path = dir.path().join("results.jsonl");
    let output = output_config(OutputFormat::Jsonl, &out_path);

    let extractor = HttpExtractor::new(&create_test_user_agent(), &ExtractorConfig::default())
        .expect("Failed to build extractor");
    let coordinator = Coordinator::setup(
        create_test_settings(2),
        extractor,
        JsonLinesWriter::new(),
        &output,
    )
    .expect("Failed to set up coordinator");

    let report = coordinator
        .process([format!("{}/", server.uri())])
        .await
        .expect("Crawl failed");

    assert_eq!(report.urls_attempted, 2);
    assert!(report.persisted <= 2);

    let lines = std::fs::read_to_string(&out_path)
        .expect("Failed to read output")
        .lines()
        .count() as u64;
    assert_eq!(lines, report.persisted);

    let requests = server.received_requests().await.expect("Recording disabled");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let server = start_test_site().await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("crawl.db");

    let config = parse_config(&format!(
        r#"
[crawler]
pool-size = 4
batch-size = 3
fetch-budget = 50
poll-backoff-ms = 1
persist-backoff-ms = 1
seeds = ["{base}"]

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
format = "sqlite"
path = "{db}"
"#,
        base = server.uri(),
        db = db_path.to_string_lossy()
    ))
    .expect("Failed to parse config");

    let report = crawl(&config).await.expect("Crawl failed");
    assert_eq!(report.persisted, 3);

    let stats = load_statistics(&db_path).expect("Failed to read statistics");
    assert_eq!(stats.total_pages, 3);
}
