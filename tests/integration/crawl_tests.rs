//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use multisite_crawler::config::{load_config, Config, CrawlerConfig, OutputConfig, SiteConfig};
use multisite_crawler::crawler::{run_crawl, CrawlRun, FailureReason, IssueKind};
use multisite_crawler::output::{read_records, write_json_document, CrawlEvent, MemoryReporter};
use multisite_crawler::schema::SchemaValidator;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Crawler settings for tests: no throttle, short timeout
fn crawler_config(request_timeout_secs: u64) -> CrawlerConfig {
    CrawlerConfig {
        request_timeout_secs,
        request_delay_ms: 0,
        ..CrawlerConfig::default()
    }
}

fn create_test_config(crawler: CrawlerConfig, sites: Vec<SiteConfig>) -> Config {
    Config {
        crawler,
        output: OutputConfig::default(),
        sites,
    }
}

async fn crawl(config: &Config) -> (CrawlRun, Arc<MemoryReporter>) {
    let reporter = Arc::new(MemoryReporter::new());
    let run = run_crawl(config, reporter.clone(), CancellationToken::new())
        .await
        .expect("Crawl should succeed");
    (run, reporter)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_blog_scenario_over_http() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "<h1>Hello</h1><p>First post.</p>", 1).await;

    let site = SiteConfig::new("blog", vec![format!("{}/a", server.uri())])
        .with_depth(0)
        .with_selector("title", "h1")
        .with_selector("author", ".byline");
    let config = create_test_config(crawler_config(5), vec![site]);

    let (run, reporter) = crawl(&config).await;

    assert_eq!(run.records.len(), 1);
    let record = &run.records[0];
    assert_eq!(record.source_url, format!("{}/a", server.uri()));
    assert_eq!(record.title, "Hello");
    assert_eq!(record.author, "");
    assert_eq!(record.clean_text, "Hello First post.");
    assert!(record.raw_html.contains("<h1>Hello</h1>"));

    // The missing byline is a warning, not an error
    assert_eq!(run.error_count(), 0);
    assert_eq!(run.warning_count(), 1);
    assert_eq!(
        reporter.count(|e| matches!(e, CrawlEvent::PartialExtraction { .. })),
        1
    );

    let report = SchemaValidator::new().validate_records(&run.records);
    assert!(report.valid, "violations: {:?}", report.violations);
}

#[tokio::test]
async fn test_one_site_times_out() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<h1>Too late</h1>").set_delay(Duration::from_secs(3)))
        .mount(&slow)
        .await;

    let fast = MockServer::start().await;
    mount_page(&fast, "/", "<h1>On time</h1>", 1).await;

    let config = create_test_config(
        crawler_config(1),
        vec![
            SiteConfig::new("slow", vec![format!("{}/", slow.uri())]),
            SiteConfig::new("fast", vec![format!("{}/", fast.uri())]).with_selector("title", "h1"),
        ],
    );

    let (run, _) = crawl(&config).await;

    assert_eq!(run.records.len(), 1);
    assert_eq!(run.records[0].title, "On time");
    assert_eq!(run.per_site_errors.len(), 1);

    let issues = run.issues_for("slow");
    assert_eq!(issues.len(), 1);
    assert_eq!(
        issues[0].kind,
        IssueKind::FetchFailed {
            reason: FailureReason::Timeout,
            retriable: true
        }
    );

    let report = SchemaValidator::new().validate_document(&run.to_document().unwrap());
    assert!(report.valid);
}

#[tokio::test]
async fn test_depth_crawl_fetches_each_page_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/a">A</a><a href="/b">B</a>"#, 1).await;
    mount_page(&server, "/a", r#"<a href="/">Home</a><a href="/b">B</a>"#, 1).await;
    mount_page(
        &server,
        "/b",
        r#"<a href="/a#comments">A</a><a href="/?utm_source=feed">Home</a><a href="/c">C</a>"#,
        1,
    )
    .await;
    mount_page(&server, "/c", r#"<a href="/d">D</a>"#, 1).await;
    mount_page(&server, "/d", "too deep", 0).await;

    let site = SiteConfig::new("cyclic", vec![format!("{}/", server.uri())]).with_depth(2);
    let config = create_test_config(crawler_config(5), vec![site]);

    let (run, _) = crawl(&config).await;

    let paths: Vec<_> = run
        .records
        .iter()
        .map(|r| url::Url::parse(&r.source_url).unwrap().path().to_string())
        .collect();
    assert_eq!(paths, ["/", "/a", "/b", "/c"]);
    assert_eq!(run.fetches, 4);
    assert!(run.per_site_errors.is_empty());
}

#[tokio::test]
async fn test_concurrent_fetches_keep_frontier_order() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/slow">S</a><a href="/quick">Q</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<h1>slow</h1>").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/quick", "<h1>quick</h1>", 1).await;

    let crawler = CrawlerConfig {
        max_concurrent_fetches: 4,
        ..crawler_config(5)
    };
    let site = SiteConfig::new("parallel", vec![format!("{}/", server.uri())])
        .with_depth(1)
        .with_selector("title", "h1");
    let config = create_test_config(crawler, vec![site]);

    let (run, _) = crawl(&config).await;

    let titles: Vec<_> = run.records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, ["", "slow", "quick"]);
}

#[tokio::test]
async fn test_redirect_keeps_requested_url_and_resolves_links_from_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/blog/"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/blog/", r#"<h1>Blog</h1><a href="post">Post</a>"#, 1).await;
    mount_page(&server, "/blog/post", "<h1>Post</h1>", 1).await;

    let site = SiteConfig::new("moved", vec![format!("{}/old", server.uri())])
        .with_depth(1)
        .with_selector("title", "h1");
    let config = create_test_config(crawler_config(5), vec![site]);

    let (run, _) = crawl(&config).await;

    assert_eq!(run.records.len(), 2);
    assert_eq!(run.records[0].source_url, format!("{}/old", server.uri()));
    assert_eq!(run.records[0].title, "Blog");
    assert_eq!(run.records[1].source_url, format!("{}/blog/post", server.uri()));
}

#[tokio::test]
async fn test_redirects_disabled_reports_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .mount(&server)
        .await;
    mount_page(&server, "/new", "new", 0).await;

    let crawler = CrawlerConfig {
        max_redirects: 0,
        ..crawler_config(5)
    };
    let site = SiteConfig::new("moved", vec![format!("{}/old", server.uri())]);
    let config = create_test_config(crawler, vec![site]);

    let (run, _) = crawl(&config).await;

    assert!(run.records.is_empty());
    assert!(matches!(
        run.issues_for("moved")[0].kind,
        IssueKind::FetchFailed {
            reason: FailureReason::HttpError(302),
            retriable: false
        }
    ));
}

#[tokio::test]
async fn test_http_errors_and_unreachable_hosts_are_isolated() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        r#"<a href="/missing">404</a><a href="/broken">500</a><a href="/fine">ok</a>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/fine", "fine", 1).await;

    let config = create_test_config(
        crawler_config(5),
        vec![
            SiteConfig::new("flaky", vec![format!("{}/", server.uri())]).with_depth(1),
            // Port 1 is closed on any sane test host
            SiteConfig::new("offline", vec!["http://127.0.0.1:1/".to_string()]),
        ],
    );

    let (run, reporter) = crawl(&config).await;

    assert_eq!(run.records.len(), 2);

    let flaky: Vec<_> = run
        .issues_for("flaky")
        .iter()
        .map(|issue| match &issue.kind {
            IssueKind::FetchFailed { reason, retriable } => (reason.to_string(), *retriable),
            other => panic!("unexpected issue {:?}", other),
        })
        .collect();
    assert_eq!(
        flaky,
        [
            ("http-error:404".to_string(), false),
            ("http-error:503".to_string(), true)
        ]
    );

    let offline = run.issues_for("offline");
    assert_eq!(offline.len(), 1);
    assert!(matches!(
        &offline[0].kind,
        IssueKind::FetchFailed {
            reason: FailureReason::ConnectionError(_) | FailureReason::Timeout,
            retriable: true
        }
    ));

    assert_eq!(
        reporter.count(|e| matches!(e, CrawlEvent::FetchFailed { .. })),
        3
    );
}

#[tokio::test]
async fn test_disabled_site_never_requested() {
    let enabled = MockServer::start().await;
    mount_page(&enabled, "/", "on", 1).await;

    let disabled = MockServer::start().await;
    mount_page(&disabled, "/", "off", 0).await;

    let config = create_test_config(
        crawler_config(5),
        vec![
            SiteConfig::new("off", vec![format!("{}/", disabled.uri())]).disabled(),
            SiteConfig::new("on", vec![format!("{}/", enabled.uri())]),
        ],
    );

    let (run, reporter) = crawl(&config).await;

    assert_eq!(run.sites_crawled, 1);
    assert_eq!(run.records.len(), 1);
    assert_eq!(
        reporter.count(|e| matches!(e, CrawlEvent::SiteStarted { .. })),
        1
    );
}

#[tokio::test]
async fn test_yaml_config_to_saved_output() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/post",
        r#"<article><h1>Release notes</h1><span class="by">Ada</span>
           <time datetime="2024-05-20T08:00:00Z">May 20</time>
           <p>Shipped it.</p></article>"#,
        1,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("crawl_configs.yaml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"
crawler:
  request_timeout_secs: 5
  request_delay_ms: 0
output:
  data_path: "out/output_data.json"
sites:
  - name: release-blog
    enabled: true
    start_urls: ["{}/post"]
    crawl_depth: 0
    selector_mappings:
      title: "h1"
      author: ".by"
      publish_date: "attr:time@datetime"
      content: "article p"
  - name: parked
    enabled: false
    start_urls: ["http://parked.invalid/"]
"#,
        server.uri()
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let (run, _) = crawl(&config).await;

    assert_eq!(run.records.len(), 1);
    let record = &run.records[0];
    assert_eq!(record.title, "Release notes");
    assert_eq!(record.author, "Ada");
    assert_eq!(record.publish_date, "2024-05-20T08:00:00+00:00");
    assert_eq!(record.clean_text, "Shipped it.");

    let output_path = dir.path().join(&config.output.data_path);
    write_json_document(&run.to_document().unwrap(), &output_path).unwrap();
    let reloaded = read_records(&output_path).unwrap();
    assert_eq!(reloaded, run.records);

    let document = multisite_crawler::output::read_json_document(&output_path).unwrap();
    assert_eq!(document[0]["url"], json!(format!("{}/post", server.uri())));
    assert!(SchemaValidator::new().validate_document(&document).valid);
}
