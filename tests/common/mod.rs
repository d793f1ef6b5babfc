// tests/common/mod.rs

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use vanguard_recon::config::Config;
use vanguard_recon::core::error::DnsError;
use vanguard_recon::core::models::ScanEvent;
use vanguard_recon::core::registry::JobRegistry;
use vanguard_recon::core::resolver::Resolve;
use vanguard_recon::core::scanner::{upstream_client, ScanDeps};
use vanguard_recon::core::stats::Statistics;
use vanguard_recon::core::stream::{ScanStream, StreamPublisher};

/// Answers A queries for a fixed set of names and NS queries with a fixed list.
#[derive(Default)]
pub struct FakeResolver {
    hosts: HashSet<String>,
    nameservers: Vec<String>,
}

impl FakeResolver {
    pub fn with_hosts(hosts: &[&str]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            nameservers: Vec::new(),
        }
    }

    pub fn with_nameservers(nameservers: &[&str]) -> Self {
        Self {
            hosts: HashSet::new(),
            nameservers: nameservers.iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Resolve for FakeResolver {
    async fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        if self.hosts.contains(host) {
            Ok(vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))])
        } else {
            Err(DnsError::NoRecords(host.to_string()))
        }
    }

    async fn lookup_ns(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        if self.nameservers.is_empty() {
            Err(DnsError::NoNameservers(domain.to_string()))
        } else {
            Ok(self.nameservers.clone())
        }
    }
}

/// Defaults with every upstream pointed at `base` (a mock server URI).
pub fn config_for(base: &str) -> Config {
    let mut config = Config::default();
    config.upstream.wayback_url = format!("{base}/cdx/search/cdx");
    config.upstream.crtsh_url = format!("{base}/");
    config.upstream.search_url = format!("{base}/search");
    config.dns.concurrency = 4;
    config.dns.permute_concurrency = 4;
    config.zone.connect_timeout = Duration::from_secs(2);
    config
}

/// Defaults with every upstream pointed at a closed local port.
pub fn offline_config() -> Config {
    config_for("http://127.0.0.1:9")
}

pub fn publisher(config: Config, resolver: impl Resolve + 'static) -> StreamPublisher {
    let config = Arc::new(config);
    let registry = Arc::new(JobRegistry::new(config.security.max_concurrent_jobs));
    let deps = ScanDeps {
        http: upstream_client(&config.http).unwrap(),
        config,
        resolver: Arc::new(resolver),
    };
    StreamPublisher::new(deps, registry, Arc::new(Statistics::new()))
}

/// Drains a stream to its end, failing the test if that takes too long.
pub async fn collect(mut stream: ScanStream) -> Vec<ScanEvent> {
    tokio::time::timeout(Duration::from_secs(10), async move {
        let mut events = Vec::new();
        while let Some(event) = stream.events.recv().await {
            events.push(event);
        }
        events
    })
    .await
    .expect("stream did not finish in time")
}

pub fn hosts(events: &[ScanEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Host(host) => Some(host.clone()),
            _ => None,
        })
        .collect()
}
