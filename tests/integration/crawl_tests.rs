//! End-to-end crawls over HTTP
//!
//! These tests use wiremock to create mock HTTP servers and run the
//! HTTP-backed collaborators through full crawls.

use chrono::Utc;
use seo_ripple::config::Config;
use seo_ripple::crawler::{Collaborators, Coordinator, CrawlOutcome};
use seo_ripple::output::{export, CrawlReport, ExportFormat};
use seo_ripple::page::PageResult;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::for_start_url(base_url);
    config.crawler.max_depth = 3;
    config.crawler.max_pages = 50;
    config.crawler.workers = 2;
    config.crawler.max_retries = 0;
    config.crawler.timeout_secs = 5;
    config
}

async fn run_crawl(config: Config) -> (CrawlOutcome, Coordinator) {
    let collaborators =
        Collaborators::http(&config.crawler).expect("Failed to build HTTP collaborators");
    let coordinator = Coordinator::new(config, collaborators, CancellationToken::new());
    let outcome = coordinator.crawl().await.expect("Crawl failed");
    (outcome, coordinator)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn page<'a>(pages: &'a [PageResult], url: &str) -> &'a PageResult {
    pages
        .iter()
        .find(|p| p.url == url)
        .unwrap_or_else(|| panic!("{} was not crawled", url))
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<html lang="en"><head>
                <title>Home</title>
                <meta name="description" content="The home page">
            </head><body>
                <h1>Welcome</h1>
                <a href="{base}/page1">Page 1</a>
                <a href="/old">Old page</a>
                <a href="https://external.test/x">Elsewhere</a>
                <img src="/logo.png" alt="Logo">
            </body></html>"#,
            base = base_url
        ),
    )
    .await;

    mount_page(
        &mock_server,
        "/page1",
        r#"<html><head><title>Page 1</title><meta name="robots" content="noindex"></head>
           <body><h1>One</h1></body></html>"#
            .to_string(),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/page2"))
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/page2",
        r#"<html><head><title>Page 2</title><link rel="canonical" href="/page1"></head>
           <body><h2>Two</h2></body></html>"#
            .to_string(),
    )
    .await;

    let (outcome, coordinator) = run_crawl(create_test_config(&base_url)).await;

    let crawled: HashSet<_> = outcome.pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(
        crawled,
        [
            format!("{}/", base_url),
            format!("{}/page1", base_url),
            format!("{}/old", base_url),
        ]
        .into_iter()
        .collect()
    );

    let home = page(&outcome.pages, &format!("{}/", base_url));
    assert_eq!(home.status_code, 200);
    assert_eq!(home.title, "Home");
    assert_eq!(home.meta_description, "The home page");
    assert_eq!(home.lang.as_deref(), Some("en"));
    assert_eq!(home.headings.h1, vec!["Welcome".to_string()]);
    assert_eq!(home.external_links, vec!["https://external.test/x".to_string()]);
    assert_eq!(home.images.len(), 1);
    assert_eq!(home.images[0].alt, "Logo");
    assert!(home.indexability.indexable);

    let page1 = page(&outcome.pages, &format!("{}/page1", base_url));
    assert!(page1.indexability.noindex);
    assert!(!page1.indexability.indexable);

    let old = page(&outcome.pages, &format!("{}/old", base_url));
    assert_eq!(old.final_url, format!("{}/page2", base_url));
    assert_eq!(old.redirect_chain.len(), 1);
    assert_eq!(old.redirect_chain[0].status, 301);
    assert_eq!(old.title, "Page 2");
    assert!(old.indexability.canonicalized);

    let graph = coordinator.link_graph();
    assert!(graph
        .targets(&format!("{}/", base_url))
        .contains(&"https://external.test/x".to_string()));
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"))
        .mount(&mock_server)
        .await;

    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <a href="/allowed">Allowed Page</a>
            <a href="/admin">Admin Page</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    mount_page(
        &mock_server,
        "/allowed",
        "<html><head><title>Allowed</title></head><body>Allowed content</body></html>".to_string(),
    )
    .await;

    // The admin page must never be requested
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(html("<html><title>Admin</title></html>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (outcome, _) = run_crawl(create_test_config(&base_url)).await;

    assert_eq!(outcome.pages.len(), 2);
    assert!(outcome
        .pages
        .iter()
        .all(|p| !p.url.ends_with("/admin")));
}

#[tokio::test]
async fn test_sitemap_seeding() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("Sitemap: {}/sitemaps/index.xml", base_url)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemaps/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{}/sitemaps/pages.xml</loc></sitemap>
</sitemapindex>"#,
                base_url
            ),
            "application/xml",
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemaps/pages.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/a</loc></url>
  <url><loc>{base}/b</loc></url>
</urlset>"#,
                base = base_url
            ),
            "application/xml",
        ))
        .mount(&mock_server)
        .await;

    mount_page(&mock_server, "/a", "<html><title>A</title></html>".to_string()).await;
    mount_page(&mock_server, "/b", "<html><title>B</title></html>".to_string()).await;

    let mut config = create_test_config(&base_url);
    config.crawler.parse_sitemap = true;
    let (outcome, _) = run_crawl(config).await;

    let crawled: HashSet<_> = outcome.pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(
        crawled,
        [format!("{}/a", base_url), format!("{}/b", base_url)]
            .into_iter()
            .collect()
    );
    assert!(outcome.pages.iter().all(|p| p.depth == 0));
}

#[tokio::test]
async fn test_missing_start_page_is_reported() {
    let mock_server = MockServer::start().await;

    let (outcome, _) = run_crawl(create_test_config(&mock_server.uri())).await;

    assert_eq!(outcome.pages.len(), 1);
    assert_eq!(outcome.pages[0].status_code, 404);
    assert!(!outcome.pages[0].indexability.indexable);
}

#[tokio::test]
async fn test_crawl_exports() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body><a href="/next">Next</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/next",
        "<html><head><title>Next</title></head><body></body></html>".to_string(),
    )
    .await;

    let started_at = Utc::now();
    let (outcome, coordinator) = run_crawl(create_test_config(&base_url)).await;
    let report = CrawlReport::new(
        format!("{}/", base_url),
        started_at,
        outcome,
        coordinator.link_graph(),
    );

    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("report.json");
    export(&report, ExportFormat::Json, &json_path).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["outcome"]["pages"].as_array().unwrap().len(), 2);

    let md_path = dir.path().join("report.md");
    export(&report, ExportFormat::Markdown, &md_path).unwrap();
    let markdown = std::fs::read_to_string(&md_path).unwrap();
    assert!(markdown.contains(&format!("{}/next", base_url)));

    let db_path = dir.path().join("report.db");
    export(&report, ExportFormat::Sqlite, &db_path).unwrap();
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let pages: i64 = conn
        .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))
        .unwrap();
    assert_eq!(pages, 2);
}
