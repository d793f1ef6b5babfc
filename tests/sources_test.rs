// tests/sources_test.rs

mod common;

use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use common::{collect, config_for, hosts, offline_config, publisher, FakeResolver};
use vanguard_recon::core::models::{CancelReason, ScanEvent, ScanOutcome, Source};

#[tokio::test]
async fn crtsh_names_are_split_filtered_and_deduplicated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "%.example.com"))
        .and(query_param("output", "json"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name_value": "*.example.com\nwww.example.com" },
            { "name_value": "api.example.com" },
            { "name_value": "example.com" },
            { "name_value": "WWW.example.com" },
            { "name_value": "evil.org" },
            { "id": 42 }
        ])))
        .mount(&server)
        .await;

    let publisher = publisher(config_for(&server.uri()), FakeResolver::default());
    let events = collect(publisher.start("example.com", Source::Crtsh).unwrap()).await;

    assert_eq!(hosts(&events), vec!["www.example.com", "api.example.com"]);
    assert_eq!(
        events.last(),
        Some(&ScanEvent::Finished(ScanOutcome::Completed { found: 2 }))
    );
    assert_eq!(
        ScanOutcome::Completed { found: 2 }.message(Source::Crtsh),
        "Certificate transparency scan completed - found 2 hosts"
    );
}

#[tokio::test]
async fn crtsh_non_json_answer_fails_the_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>rate limited</html>"),
        )
        .mount(&server)
        .await;

    let publisher = publisher(config_for(&server.uri()), FakeResolver::default());
    let events = collect(publisher.start("example.com", Source::Crtsh).unwrap()).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        ScanEvent::Finished(ScanOutcome::Failed { found, reason }) => {
            assert_eq!(*found, 0);
            assert!(reason.contains("content type"), "reason: {reason}");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn crtsh_upstream_error_status_fails_the_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let publisher = publisher(config_for(&server.uri()), FakeResolver::default());
    let events = collect(publisher.start("example.com", Source::Crtsh).unwrap()).await;
    assert!(matches!(
        events.last(),
        Some(ScanEvent::Finished(ScanOutcome::Failed { .. }))
    ));
}

#[tokio::test]
async fn wayback_lines_keep_document_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cdx/search/cdx"))
        .and(query_param("url", "*.example.com/*"))
        .and(query_param("fl", "original"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "https://shop.example.com/cart\n\
             http://blog.example.com:80/post?id=1\n\
             https://shop.example.com/other\n\
             https://example.com/\n\
             not a url\n\
             https://cdn.example.com/app.js",
        ))
        .mount(&server)
        .await;

    let publisher = publisher(config_for(&server.uri()), FakeResolver::default());
    let events = collect(publisher.start("example.com", Source::Wayback).unwrap()).await;

    assert_eq!(
        hosts(&events),
        vec!["shop.example.com", "blog.example.com", "cdn.example.com"]
    );
    assert_eq!(
        events.last(),
        Some(&ScanEvent::Finished(ScanOutcome::Completed { found: 3 }))
    );
}

#[tokio::test]
async fn search_page_links_become_hosts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "site:example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="https://docs.example.com/x">d</a> <a href="https://other.net/">o</a>"#,
        ))
        .mount(&server)
        .await;

    let publisher = publisher(config_for(&server.uri()), FakeResolver::default());
    let events = collect(publisher.start("example.com", Source::Search).unwrap()).await;
    assert_eq!(hosts(&events), vec!["docs.example.com"]);
}

#[tokio::test]
async fn dns_brute_force_emits_resolving_words_only() {
    let resolver = FakeResolver::with_hosts(&["www.example.com", "mail.example.com"]);
    let publisher = publisher(offline_config(), resolver);
    let events = collect(publisher.start("example.com", Source::Dns).unwrap()).await;

    let mut found = hosts(&events);
    found.sort();
    assert_eq!(found, vec!["mail.example.com", "www.example.com"]);
    assert_eq!(
        events.last(),
        Some(&ScanEvent::Finished(ScanOutcome::Completed { found: 2 }))
    );
}

#[tokio::test]
async fn dns_brute_force_with_nothing_resolving_completes_empty() {
    let publisher = publisher(offline_config(), FakeResolver::default());
    let events = collect(publisher.start("example.com", Source::Dns).unwrap()).await;
    assert_eq!(
        events,
        vec![ScanEvent::Finished(ScanOutcome::Completed { found: 0 })]
    );
}

#[tokio::test]
async fn permutations_resolve_through_the_pool() {
    let resolver = FakeResolver::with_hosts(&["dev-api.example.com", "www3.example.com"]);
    let publisher = publisher(offline_config(), resolver);
    let events = collect(publisher.start("example.com", Source::Permute).unwrap()).await;

    let mut found = hosts(&events);
    found.sort();
    assert_eq!(found, vec!["dev-api.example.com", "www3.example.com"]);
}

#[tokio::test]
async fn zone_reports_reachable_nameservers_only() {
    let listener = TcpListener::bind("0.0.0.0:0").await.unwrap();
    let mut config = offline_config();
    config.zone.port = listener.local_addr().unwrap().port();

    let resolver = FakeResolver::with_nameservers(&["127.0.0.1", "127.0.0.2", "nonexistent.invalid"]);
    let publisher = publisher(config, resolver);
    let events = collect(publisher.start("example.com", Source::Zone).unwrap()).await;

    assert_eq!(
        events.first(),
        Some(&ScanEvent::Notice("Found 3 nameservers for example.com".to_string()))
    );
    assert_eq!(hosts(&events), vec!["127.0.0.1", "127.0.0.2"]);
    let failures = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::Notice(text) if text.starts_with("Failed to connect to nonexistent.invalid")))
        .count();
    assert_eq!(failures, 1);

    let Some(ScanEvent::Finished(outcome)) = events.last() else {
        panic!("stream did not end with a terminal event");
    };
    assert_eq!(outcome, &ScanOutcome::Completed { found: 2 });
    assert_eq!(
        outcome.message(Source::Zone),
        "Zone transfer scan completed - found 2 nameservers"
    );
    drop(listener);
}

#[tokio::test]
async fn zone_without_nameservers_fails() {
    let publisher = publisher(offline_config(), FakeResolver::default());
    let events = collect(publisher.start("example.com", Source::Zone).unwrap()).await;
    assert!(matches!(
        events.last(),
        Some(ScanEvent::Finished(ScanOutcome::Failed { .. }))
    ));
}

async fn slow_archive() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cdx/search/cdx"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("https://late.example.com/\n")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn restarting_a_stream_cancels_the_previous_one() {
    let server = slow_archive().await;
    let publisher = publisher(config_for(&server.uri()), FakeResolver::default());

    let first = publisher.start("example.com", Source::Wayback).unwrap();
    let second = publisher.start("example.com", Source::Wayback).unwrap();
    assert_ne!(first.job_id, second.job_id);

    let events = collect(first).await;
    assert_eq!(
        events,
        vec![ScanEvent::Finished(ScanOutcome::Cancelled {
            found: 0,
            reason: CancelReason::Superseded
        })]
    );
    assert_eq!(publisher.registry().active_count(), 1);
    assert_eq!(publisher.registry().abort("example.com"), 1);
    let events = collect(second).await;
    assert!(matches!(
        events.last(),
        Some(ScanEvent::Finished(ScanOutcome::Cancelled {
            reason: CancelReason::Aborted,
            ..
        }))
    ));
}

#[tokio::test]
async fn abort_leaves_other_targets_running() {
    let server = slow_archive().await;
    let publisher = publisher(config_for(&server.uri()), FakeResolver::default());

    let a = publisher.start("a-target.com", Source::Wayback).unwrap();
    let b = publisher.start("b-target.com", Source::Wayback).unwrap();

    assert_eq!(publisher.registry().abort("a-target.com"), 1);
    let events = collect(a).await;
    assert!(matches!(
        events.last(),
        Some(ScanEvent::Finished(ScanOutcome::Cancelled { .. }))
    ));

    let status = publisher.registry().status("b-target.com");
    assert!(status.active);
    assert_eq!(status.sources, vec![Source::Wayback]);

    publisher.registry().abort("b-target.com");
    collect(b).await;
    assert_eq!(publisher.registry().active_count(), 0);
}

#[tokio::test]
async fn source_timeout_cancels_the_job() {
    let server = slow_archive().await;
    let mut config = config_for(&server.uri());
    config.timeouts.wayback = Duration::from_millis(200);
    let publisher = publisher(config, FakeResolver::default());

    let started = std::time::Instant::now();
    let events = collect(publisher.start("example.com", Source::Wayback).unwrap()).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        events,
        vec![ScanEvent::Finished(ScanOutcome::Cancelled {
            found: 0,
            reason: CancelReason::Deadline
        })]
    );
}
