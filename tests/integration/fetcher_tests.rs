//! HttpFetcher against a mock server

use seo_ripple::config::CrawlerConfig;
use seo_ripple::crawler::{build_http_client, FetchError, Fetcher, HttpFetcher, MAX_REDIRECTS};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(server: &MockServer, max_retries: u32) -> HttpFetcher {
    let mut config = CrawlerConfig::new(server.uri());
    config.timeout_secs = 5;
    let client = build_http_client(&config).expect("Failed to build client");
    HttpFetcher::with_client(client, max_retries).with_retry_delay(Duration::from_millis(10))
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

fn redirect(status: u16, location: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).insert_header("location", location)
}

#[tokio::test]
async fn test_redirect_chain_is_recorded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(redirect(301, "/b"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(redirect(302, "/c"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><title>C</title></html>", "text/html")
                .insert_header("x-robots-tag", "noindex"),
        )
        .mount(&server)
        .await;

    let response = fetcher(&server, 0)
        .fetch(&url(&server, "/a"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.final_url, url(&server, "/c"));
    assert_eq!(
        response
            .redirect_chain
            .iter()
            .map(|hop| (hop.url.clone(), hop.status))
            .collect::<Vec<_>>(),
        vec![
            (url(&server, "/a").to_string(), 301),
            (url(&server, "/b").to_string(), 302),
        ]
    );
    assert_eq!(response.x_robots_tag.as_deref(), Some("noindex"));
    assert!(response.content_type.starts_with("text/html"));
    assert_eq!(response.body, b"<html><title>C</title></html>".to_vec());
}

#[tokio::test]
async fn test_redirect_loop_is_detected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(redirect(301, "/y"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/y"))
        .respond_with(redirect(301, "/x"))
        .mount(&server)
        .await;

    let result = fetcher(&server, 0)
        .fetch(&url(&server, "/x"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(FetchError::RedirectLoop(_))));
}

#[tokio::test]
async fn test_redirect_limit() {
    let server = MockServer::start().await;

    for hop in 0..=MAX_REDIRECTS {
        Mock::given(method("GET"))
            .and(path(format!("/r{}", hop)))
            .respond_with(redirect(302, &format!("/r{}", hop + 1)))
            .mount(&server)
            .await;
    }

    let result = fetcher(&server, 0)
        .fetch(&url(&server, "/r0"), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(FetchError::TooManyRedirects(MAX_REDIRECTS))));
}

#[tokio::test]
async fn test_non_html_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&server)
        .await;

    let result = fetcher(&server, 0)
        .fetch(&url(&server, "/report.pdf"), &CancellationToken::new())
        .await;

    match result {
        Err(FetchError::NonHtml { content_type }) => assert_eq!(content_type, "application/pdf"),
        other => panic!("expected NonHtml, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_errors_are_returned_with_status() {
    let server = MockServer::start().await;

    let response = fetcher(&server, 2)
        .fetch(&url(&server, "/nowhere"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(response.redirect_chain.is_empty());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&server)
        .await;

    let response = fetcher(&server, 2)
        .fetch(&url(&server, "/flaky"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let response = fetcher(&server, 2)
        .fetch(&url(&server, "/down"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.status, 500);
}

#[tokio::test]
async fn test_cancellation_aborts_slow_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html></html>", "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = fetcher(&server, 0).fetch(&url(&server, "/slow"), &cancel).await;

    assert!(matches!(result, Err(FetchError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
}
