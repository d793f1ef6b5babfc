// tests/probe_test.rs

use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use vanguard_recon::config::Config;
use vanguard_recon::core::models::{CONNECTION_FAILED, NO_TITLE};
use vanguard_recon::core::scanner::probe::HttpProber;

fn prober(max_body_size: usize) -> HttpProber {
    let mut config = Config::default();
    config.http.max_body_size = max_body_size;
    HttpProber::new(&config.http, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn reachable_page_reports_status_and_title() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>\n  Admin   Portal\n</title></head></html>"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/", server.uri());
    let result = prober(1024 * 1024).probe(&url).await;
    assert_eq!(result.status, "200");
    assert_eq!(result.title, "Admin Portal");
    assert!(result.error.is_empty());
    assert!(result.is_success());

    // Same resource, same answer.
    let again = prober(1024 * 1024).probe(&url).await;
    assert_eq!((again.status, again.title), (result.status, result.title));
}

#[tokio::test]
async fn error_status_without_title_is_still_a_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let result = prober(1024).probe(&format!("{}/missing", server.uri())).await;
    assert_eq!(result.status, "404");
    assert_eq!(result.title, NO_TITLE);
}

#[tokio::test]
async fn unresolvable_host_maps_to_status_zero() {
    let result = prober(1024).probe("http://nonexistent.invalid").await;
    assert_eq!(result.status, "0");
    assert_eq!(result.title, CONNECTION_FAILED);
    assert!(!result.error.is_empty());
}

#[tokio::test]
async fn redirect_loop_exceeds_the_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
        .mount(&server)
        .await;

    let result = prober(1024).probe(&format!("{}/loop", server.uri())).await;
    assert_eq!(result.status, "0");
    assert!(!result.error.is_empty());
}

#[tokio::test]
async fn title_past_the_body_cap_is_not_seen() {
    let server = MockServer::start().await;
    let body = format!("{}<title>Hidden</title>", " ".repeat(64));
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let result = prober(32).probe(&server.uri()).await;
    assert_eq!(result.status, "200");
    assert_eq!(result.title, NO_TITLE);
}
