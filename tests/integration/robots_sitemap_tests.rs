//! robots.txt and sitemap collaborators over HTTP

use seo_ripple::config::CrawlerConfig;
use seo_ripple::crawler::build_http_client;
use seo_ripple::robots::{RobotsChecker, RobotsPolicy};
use seo_ripple::sitemap::{HttpSitemap, SitemapSource};
use seo_ripple::RippleError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> reqwest::Client {
    let config = CrawlerConfig::new(server.uri());
    build_http_client(&config).expect("Failed to build client")
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/xml")
}

#[tokio::test]
async fn test_robots_rules_are_applied_and_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "User-agent: seo-ripple\nDisallow: /private\n\nUser-agent: *\nDisallow: /",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let checker = RobotsChecker::new(client(&server), "seo-ripple/0.1 (+https://example.com)");

    assert!(!checker.is_allowed(&url(&server, "/private/data")).await.unwrap());
    assert!(checker.is_allowed(&url(&server, "/public")).await.unwrap());
    assert!(checker.is_allowed(&url(&server, "/")).await.unwrap());
    assert_eq!(checker.cached_origins(), 1);
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;

    let checker = RobotsChecker::new(client(&server), "TestBot/1.0");
    assert!(checker.is_allowed(&url(&server, "/anything")).await.unwrap());
}

#[tokio::test]
async fn test_robots_server_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let checker = RobotsChecker::new(client(&server), "TestBot/1.0");
    let result = checker.is_allowed(&url(&server, "/page")).await;

    assert!(matches!(result, Err(RippleError::Status { status: 503, .. })));
}

#[tokio::test]
async fn test_robots_failure_is_not_refetched() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let checker = RobotsChecker::new(client(&server), "TestBot/1.0");

    assert!(checker.is_allowed(&url(&server, "/one")).await.is_err());
    let again = checker.is_allowed(&url(&server, "/two")).await;
    assert!(matches!(again, Err(RippleError::Robots(_))));
    assert_eq!(checker.cached_origins(), 1);
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_fetch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("User-agent: *\nDisallow: /private")
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let checker = Arc::new(RobotsChecker::new(client(&server), "TestBot/1.0"));

    let mut lookups = JoinSet::new();
    for i in 0..8 {
        let checker = Arc::clone(&checker);
        let target = url(&server, &format!("/page{}", i));
        lookups.spawn(async move { checker.is_allowed(&target).await });
    }
    while let Some(joined) = lookups.join_next().await {
        assert!(joined.unwrap().unwrap());
    }

    assert!(!checker.is_allowed(&url(&server, "/private/x")).await.unwrap());
}

#[tokio::test]
async fn test_sitemap_discovered_from_robots() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nAllow: /\nSitemap: {}/maps/main.xml",
            server.uri()
        )))
        .mount(&server)
        .await;

    let sitemap = HttpSitemap::new(client(&server));
    let discovered = sitemap
        .discover_sitemap_url(&url(&server, "/"))
        .await
        .unwrap();

    assert_eq!(discovered, url(&server, "/maps/main.xml"));
}

#[tokio::test]
async fn test_sitemap_discovery_falls_back_to_default_location() {
    let server = MockServer::start().await;

    let sitemap = HttpSitemap::new(client(&server));
    let discovered = sitemap
        .discover_sitemap_url(&url(&server, "/blog/post"))
        .await
        .unwrap();

    assert_eq!(discovered, url(&server, "/sitemap.xml"));
}

#[tokio::test]
async fn test_sitemap_index_is_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(xml(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{base}/sitemap-pages.xml</loc></sitemap>
  <sitemap><loc>{base}/sitemap-missing.xml</loc></sitemap>
  <sitemap><loc>{base}/sitemap-posts.xml</loc></sitemap>
</sitemapindex>"#,
            base = base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-pages.xml"))
        .respond_with(xml(format!(
            r#"<urlset><url><loc>{base}/about</loc></url><url><loc>{base}/contact</loc></url></urlset>"#,
            base = base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-posts.xml"))
        .respond_with(xml(format!(
            r#"<urlset><url><loc>{base}/posts/1</loc></url></urlset>"#,
            base = base
        )))
        .mount(&server)
        .await;

    let entries = HttpSitemap::new(client(&server))
        .parse_sitemap(&url(&server, "/sitemap.xml"))
        .await
        .unwrap();

    assert_eq!(
        entries,
        vec![
            format!("{}/about", base),
            format!("{}/contact", base),
            format!("{}/posts/1", base),
        ]
    );
}

#[tokio::test]
async fn test_sitemap_file_limit() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(xml(format!(
            r#"<sitemapindex>
  <sitemap><loc>{base}/one.xml</loc></sitemap>
  <sitemap><loc>{base}/two.xml</loc></sitemap>
</sitemapindex>"#,
            base = base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/one.xml"))
        .respond_with(xml(format!(
            "<urlset><url><loc>{}/first</loc></url></urlset>",
            base
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/two.xml"))
        .respond_with(xml("<urlset></urlset>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let entries = HttpSitemap::new(client(&server))
        .with_max_files(2)
        .parse_sitemap(&url(&server, "/sitemap.xml"))
        .await
        .unwrap();

    assert_eq!(entries, vec![format!("{}/first", base)]);
}

#[tokio::test]
async fn test_unreadable_sitemap_is_an_error() {
    let server = MockServer::start().await;

    let result = HttpSitemap::new(client(&server))
        .parse_sitemap(&url(&server, "/sitemap.xml"))
        .await;

    assert!(matches!(result, Err(RippleError::Status { status: 404, .. })));
}
