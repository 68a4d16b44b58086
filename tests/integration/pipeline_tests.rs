//! End-to-end scraping against mock job boards

use job_trawl::config::{parse_config, UserAgentConfig};
use job_trawl::crawler::{
    trawl_with_backend, AdmissionGate, DetailEnricher, DetailRules, DriverSettings, FetchClient,
    FetchMode, HttpBackend, PageBackend, PageSource, PaginationDriver, RetryPolicy, TrawlOptions,
};
use job_trawl::discover::BlockDiscoverer;
use job_trawl::extract::{FieldExtractor, FieldRule, MarkupKind, Rule};
use job_trawl::output::{JsonFileStore, ResultStore};
use job_trawl::{ProxyProvider, StopReason};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLATFORM: &str = "demo";
const EMPTY_PAGE: &str = "<html><body><p>No more jobs</p></body></html>";

fn html(status: u16, body: String) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body, "text/html; charset=utf-8")
}

fn job_block(title: Option<&str>, href: &str, price: &str) -> String {
    let heading = title
        .map(|t| format!("<h3>{}</h3>", t))
        .unwrap_or_default();
    format!(
        r#"<div class="job">{}<a href="{}">details</a><span class="price">{}</span></div>"#,
        heading, href, price
    )
}

fn list_page(blocks: &[String]) -> String {
    format!("<html><body>{}</body></html>", blocks.concat())
}

fn http_client() -> Arc<FetchClient> {
    let backend: Arc<dyn PageBackend> = Arc::new(HttpBackend::new(
        UserAgentConfig::default(),
        Duration::from_secs(5),
    ));
    Arc::new(FetchClient::new(
        backend,
        AdmissionGate::new(3),
        RetryPolicy::new(3, Duration::from_millis(10)),
    ))
}

/// A driver over `<server>/list/{page}` with block-structured listings
fn demo_driver(server: &MockServer, store: Arc<dyn ResultStore>) -> PaginationDriver {
    let base = Url::parse(&server.uri()).unwrap();
    let listing_fields = FieldExtractor::new(vec![
        FieldRule::text("title").rule(Rule::css("h3").unwrap()),
        FieldRule::link("url").rule(Rule::css_attr("a", "href").unwrap()),
        FieldRule::text("price").rule(Rule::css(".price").unwrap()),
    ])
    .with_base_url(base);

    let source = PageSource {
        list_url: format!("{}/list/{{page}}", server.uri()),
        mode: FetchMode::Static,
        markup: MarkupKind::Html,
        discoverer: Box::new(BlockDiscoverer::new("div.job", listing_fields).unwrap()),
    };

    let client = http_client();
    let detail = DetailRules {
        mode: FetchMode::Static,
        markup: MarkupKind::Html,
        extractor: FieldExtractor::new(vec![
            FieldRule::text("duration").rule(Rule::pattern(r"duration:\s*([^\n<]+)").unwrap())
        ]),
    };
    let enricher = DetailEnricher::new(Arc::clone(&client), detail)
        .with_timeout(Duration::from_secs(5))
        .with_per_candidate_budget(Duration::from_secs(5));

    PaginationDriver::new(
        PLATFORM,
        source,
        client,
        Arc::new(enricher),
        Arc::new(ProxyProvider::disabled()),
        store,
        DriverSettings {
            rate_limit: Duration::ZERO,
            page_retries: 1,
        },
    )
}

fn read_json(path: std::path::PathBuf) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_build_a_widget_end_to_end() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(html(
            200,
            list_page(&[
                job_block(Some("Build a widget"), "/job/1", "100"),
                job_block(None, "/job/2", "50"),
            ]),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list/2"))
        .respond_with(html(200, EMPTY_PAGE.to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job/1"))
        .respond_with(html(
            200,
            "<html><body><h1>Build a widget</h1><p>duration: 5 days</p></body></html>".to_string(),
        ))
        .mount(&server)
        .await;

    // The untitled block is never discovered, so its detail page is never fetched
    Mock::given(method("GET"))
        .and(path("/job/2"))
        .respond_with(html(200, String::new()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    let driver = demo_driver(&server, Arc::new(store.clone()));

    let outcome = driver.run(10).await;

    assert_eq!(outcome.listings.len(), 1);
    assert_eq!(outcome.report.pages_completed, 1);
    assert_eq!(outcome.report.enriched, 1);
    assert_eq!(outcome.report.stop_reason, Some(StopReason::EmptyPage));

    let saved = read_json(store.path_for(PLATFORM));
    assert_eq!(
        saved,
        json!([{
            "title": "Build a widget",
            "url": format!("{}/job/1", uri),
            "price": "100",
            "duration": "5 days",
            "platform": PLATFORM,
        }])
    );
}

#[tokio::test]
async fn test_stops_at_first_empty_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(html(
            200,
            list_page(&[
                job_block(Some("First"), "/job/1", "10"),
                job_block(Some("Second"), "/job/2", "20"),
            ]),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list/2"))
        .respond_with(html(200, list_page(&[job_block(Some("Third"), "/job/3", "30")])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list/3"))
        .respond_with(html(200, EMPTY_PAGE.to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list/4"))
        .respond_with(html(200, EMPTY_PAGE.to_string()))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/job/\d+$"))
        .respond_with(html(200, "<p>duration: 1 day</p>".to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path());
    let driver = demo_driver(&server, Arc::new(store.clone()));

    let outcome = driver.run(10).await;

    assert_eq!(outcome.report.pages_completed, 2);
    assert_eq!(outcome.report.stop_reason, Some(StopReason::EmptyPage));

    let saved = read_json(store.path_for(PLATFORM));
    let titles: Vec<_> = saved
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);
}

#[tokio::test]
async fn test_transient_listing_failure_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(html(200, list_page(&[job_block(Some("Retry me"), "/job/1", "1")])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job/1"))
        .respond_with(html(200, "<p>duration: 2 days</p>".to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let driver = demo_driver(&server, Arc::new(JsonFileStore::new(dir.path())));

    let outcome = driver.run(1).await;

    assert_eq!(outcome.report.stop_reason, Some(StopReason::PageCap));
    assert_eq!(outcome.listings.len(), 1);
    assert_eq!(outcome.listings[0].get("duration"), Some(&json!("2 days")));
}

#[tokio::test]
async fn test_failed_detail_keeps_partial_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/list/1"))
        .respond_with(html(
            200,
            list_page(&[
                job_block(Some("Works"), "/job/1", "1"),
                job_block(Some("Broken"), "/job/2", "2"),
            ]),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job/1"))
        .respond_with(html(200, "<p>duration: 3 days</p>".to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let driver = demo_driver(&server, Arc::new(JsonFileStore::new(dir.path())));

    let outcome = driver.run(1).await;

    assert_eq!(outcome.listings.len(), 2);
    assert_eq!(outcome.report.enriched, 1);
    assert_eq!(outcome.report.partial, 1);

    let broken = &outcome.listings[1];
    assert_eq!(broken.title(), Some("Broken"));
    assert_eq!(broken.get("price"), Some(&json!("2")));
    assert!(broken.get("duration").is_none());
    assert_eq!(broken.platform(), Some(PLATFORM));
}

#[tokio::test]
async fn test_trawl_writes_platform_and_combined_files() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/job/allcity/page1"))
        .respond_with(html(
            200,
            format!(
                r#"<html><body>
<div class="div_bg_color_fff div_padding_1 hover1 margin_bottom_1">
  <a href="{uri}/job/12345"><h4><b>微信小程序开发</b></h4></a>
  <span class="rixin-text-jobs">800</span>
</div>
</body></html>"#
            ),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job/allcity/page2"))
        .respond_with(html(200, EMPTY_PAGE.to_string()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job/12345"))
        .respond_with(html(
            200,
            r#"<html><body>
<h2>微信小程序开发</h2>
<ul class="basic_info_row"><li class="font_color_3">所在区域：</li><li>北京</li></ul>
</body></html>"#
                .to_string(),
        ))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = parse_config(&format!(
        r#"
[scraper]
rate-limit-ms = 0
retry-base-delay-ms = 10

[output]
directory = '{}'

[[platform]]
name = "yuanjisong"
list-url = "{}/job/allcity/page{{page}}"
"#,
        dir.path().display(),
        uri
    ))
    .unwrap();

    let backend: Arc<dyn PageBackend> = Arc::new(HttpBackend::new(
        config.user_agent.clone(),
        Duration::from_secs(5),
    ));
    let reports = trawl_with_backend(&config, &TrawlOptions::default(), backend)
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].platform, "yuanjisong");
    assert_eq!(reports[0].listings, 1);
    assert_eq!(reports[0].enriched, 1);

    let platform_file = read_json(dir.path().join("yuanjisong.json"));
    assert_eq!(platform_file[0]["title"], json!("微信小程序开发"));
    assert_eq!(platform_file[0]["price"], json!(800));
    assert_eq!(platform_file[0]["location"], json!("北京"));
    assert_eq!(platform_file[0]["platform"], json!("yuanjisong"));

    let combined = read_json(dir.path().join("all_jobs.json"));
    assert_eq!(combined["yuanjisong"], platform_file);
}
