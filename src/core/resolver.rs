// src/core/resolver.rs

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DnsConfig;
use crate::core::error::DnsError;
use crate::core::stats::Statistics;

/// Name resolution as seen by the fetchers.
///
/// The production implementation is [`DnsResolver`]; tests substitute fakes.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// A-record lookup. An empty answer is an error.
    async fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>, DnsError>;

    /// Authoritative nameserver hostnames for `domain`, without trailing dots.
    async fn lookup_ns(&self, domain: &str) -> Result<Vec<String>, DnsError>;
}

/// A pool of single-upstream resolvers, picked round-robin per query.
pub struct DnsResolver {
    servers: Vec<String>,
    resolvers: Vec<TokioAsyncResolver>,
    next: AtomicUsize,
    stats: Arc<Statistics>,
}

impl DnsResolver {
    /// Builds one resolver per configured `host:port` upstream.
    ///
    /// Entries that do not parse as socket addresses are skipped. If none are
    /// left, the system default configuration is used instead.
    pub fn new(config: &DnsConfig, stats: Arc<Statistics>) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.timeout;
        opts.attempts = config.retries.max(1);
        opts.use_hosts_file = false;

        let mut servers = Vec::new();
        let mut resolvers = Vec::new();
        for server in &config.servers {
            match server.parse::<SocketAddr>() {
                Ok(addr) => {
                    let mut resolver_config = ResolverConfig::new();
                    resolver_config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));
                    resolvers.push(TokioAsyncResolver::tokio(resolver_config, opts.clone()));
                    servers.push(server.clone());
                }
                Err(e) => warn!(server = %server, error = %e, "Skipping invalid DNS server address."),
            }
        }

        if resolvers.is_empty() {
            warn!("No usable DNS servers configured, falling back to the default resolver.");
            resolvers.push(TokioAsyncResolver::tokio(ResolverConfig::default(), opts));
            servers.push("default".to_string());
        }

        info!(servers = ?servers, "DNS resolver pool ready.");
        Self {
            servers,
            resolvers,
            next: AtomicUsize::new(0),
            stats,
        }
    }

    fn pick(&self) -> (&str, &TokioAsyncResolver) {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.resolvers.len();
        (&self.servers[index], &self.resolvers[index])
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        let (server, resolver) = self.pick();
        let answer = resolver.ipv4_lookup(host).await;
        self.stats.record_dns_query();

        let lookup = answer.map_err(|e| {
            debug!(host, server, error = %e, "A lookup failed.");
            DnsError::Query {
                host: host.to_string(),
                reason: e.to_string(),
            }
        })?;
        let ips: Vec<IpAddr> = lookup.iter().map(|a| IpAddr::V4(a.0)).collect();
        if ips.is_empty() {
            return Err(DnsError::NoRecords(host.to_string()));
        }
        Ok(ips)
    }

    async fn lookup_ns(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        let (server, resolver) = self.pick();
        let answer = resolver.ns_lookup(domain).await;
        self.stats.record_dns_query();

        let lookup = answer.map_err(|e| {
            warn!(domain, server, error = %e, "NS lookup failed.");
            DnsError::Query {
                host: domain.to_string(),
                reason: e.to_string(),
            }
        })?;
        let nameservers: Vec<String> = lookup
            .iter()
            .map(|ns| ns.to_string().trim_end_matches('.').to_lowercase())
            .collect();
        if nameservers.is_empty() {
            return Err(DnsError::NoNameservers(domain.to_string()));
        }
        Ok(nameservers)
    }
}
