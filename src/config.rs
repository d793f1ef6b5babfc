// src/config.rs

//! Runtime settings. Read once at startup from the environment; every field
//! has a default so the server runs with no configuration at all.

use serde::Serialize;
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::core::models::Source;

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub port: u16,
    pub timeouts: TimeoutConfig,
    pub dns: DnsConfig,
    pub http: HttpConfig,
    pub rate_limit: RateLimitConfig,
    pub security: SecurityConfig,
    pub upstream: UpstreamConfig,
    pub zone: ZoneConfig,
    pub stream: StreamConfig,
}

/// Deadline of each source's job.
#[derive(Debug, Clone, Serialize)]
pub struct TimeoutConfig {
    #[serde(with = "duration_str")]
    pub wayback: Duration,
    #[serde(with = "duration_str")]
    pub crtsh: Duration,
    #[serde(with = "duration_str")]
    pub dns: Duration,
    #[serde(with = "duration_str")]
    pub search: Duration,
    #[serde(with = "duration_str")]
    pub permute: Duration,
    #[serde(with = "duration_str")]
    pub zone: Duration,
    #[serde(with = "duration_str")]
    pub probe: Duration,
}

impl TimeoutConfig {
    pub fn for_source(&self, source: Source) -> Duration {
        match source {
            Source::Wayback => self.wayback,
            Source::Crtsh => self.crtsh,
            Source::Dns => self.dns,
            Source::Search => self.search,
            Source::Permute => self.permute,
            Source::Zone => self.zone,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DnsConfig {
    /// Upstream recursive resolvers as `host:port`.
    pub servers: Vec<String>,
    pub concurrency: usize,
    pub permute_concurrency: usize,
    pub retries: usize,
    #[serde(with = "duration_str")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpConfig {
    pub user_agent: String,
    pub max_redirects: usize,
    pub max_body_size: usize,
    /// Scan targets routinely present self-signed certificates, so this is on
    /// by default. It relaxes the trust boundary for probes only.
    pub skip_tls_verify: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
    #[serde(with = "duration_str")]
    pub grace: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityConfig {
    pub allowed_domains: Vec<String>,
    pub blocked_user_agents: Vec<String>,
    pub max_concurrent_jobs: usize,
    pub enable_cors: bool,
}

impl SecurityConfig {
    /// `true` when no allow-list is set or `host` suffix-matches an entry.
    pub fn is_allowed(&self, host: &str) -> bool {
        self.allowed_domains.is_empty()
            || self
                .allowed_domains
                .iter()
                .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
    }
}

/// Base URLs of the public services the passive sources query.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamConfig {
    pub wayback_url: String,
    pub crtsh_url: String,
    pub search_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoneConfig {
    pub port: u16,
    #[serde(with = "duration_str")]
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamConfig {
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            timeouts: TimeoutConfig {
                wayback: Duration::from_secs(5 * 60),
                crtsh: Duration::from_secs(5 * 60),
                dns: Duration::from_secs(10 * 60),
                search: Duration::from_secs(5 * 60),
                permute: Duration::from_secs(10 * 60),
                zone: Duration::from_secs(2 * 60),
                probe: Duration::from_secs(10),
            },
            dns: DnsConfig {
                servers: vec![
                    "8.8.8.8:53".to_string(),
                    "1.1.1.1:53".to_string(),
                    "208.67.222.222:53".to_string(),
                ],
                concurrency: 50,
                permute_concurrency: 100,
                retries: 2,
                timeout: Duration::from_secs(3),
            },
            http: HttpConfig {
                user_agent: format!(
                    "Mozilla/5.0 (compatible; VanguardRecon/{})",
                    env!("CARGO_PKG_VERSION")
                ),
                max_redirects: 3,
                max_body_size: 1024 * 1024,
                skip_tls_verify: true,
            },
            rate_limit: RateLimitConfig {
                requests_per_second: 10,
                burst_size: 20,
                grace: Duration::from_millis(100),
            },
            security: SecurityConfig {
                allowed_domains: Vec::new(),
                blocked_user_agents: vec![
                    "bot".to_string(),
                    "crawler".to_string(),
                    "spider".to_string(),
                ],
                max_concurrent_jobs: 24,
                enable_cors: true,
            },
            upstream: UpstreamConfig {
                wayback_url: "https://web.archive.org/cdx/search/cdx".to_string(),
                crtsh_url: "https://crt.sh/".to_string(),
                search_url: "https://www.google.com/search".to_string(),
            },
            zone: ZoneConfig {
                port: 53,
                connect_timeout: Duration::from_secs(5),
            },
            stream: StreamConfig { queue_capacity: 100 },
        }
    }
}

impl Config {
    /// Defaults overridden by whatever is set in the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, so tests do not have to
    /// touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let d = Config::default();
        Self {
            port: env.parse("PORT", d.port),
            timeouts: TimeoutConfig {
                wayback: env.duration("TIMEOUT_WAYBACK", d.timeouts.wayback),
                crtsh: env.duration("TIMEOUT_CRTSH", d.timeouts.crtsh),
                dns: env.duration("TIMEOUT_DNS", d.timeouts.dns),
                search: env.duration("TIMEOUT_SEARCH", d.timeouts.search),
                permute: env.duration("TIMEOUT_PERMUTE", d.timeouts.permute),
                zone: env.duration("TIMEOUT_ZONE", d.timeouts.zone),
                probe: env.duration("HTTP_PROBE_TIMEOUT", d.timeouts.probe),
            },
            dns: DnsConfig {
                servers: env.list("DNS_SERVERS", d.dns.servers),
                concurrency: env.parse("DNS_CONCURRENCY", d.dns.concurrency).max(1),
                permute_concurrency: env
                    .parse("PERMUTE_CONCURRENCY", d.dns.permute_concurrency)
                    .max(1),
                retries: env.parse("DNS_RETRIES", d.dns.retries),
                timeout: env.duration("DNS_TIMEOUT", d.dns.timeout),
            },
            http: HttpConfig {
                user_agent: env.string("HTTP_USER_AGENT", d.http.user_agent),
                max_redirects: env.parse("HTTP_MAX_REDIRECTS", d.http.max_redirects),
                max_body_size: env.parse("HTTP_MAX_BODY_SIZE", d.http.max_body_size),
                skip_tls_verify: env.parse("HTTP_SKIP_TLS_VERIFY", d.http.skip_tls_verify),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: env
                    .parse("RATE_LIMIT_RPS", d.rate_limit.requests_per_second)
                    .max(1),
                burst_size: env.parse("RATE_LIMIT_BURST", d.rate_limit.burst_size).max(1),
                grace: d.rate_limit.grace,
            },
            security: SecurityConfig {
                allowed_domains: env.list("ALLOWED_DOMAINS", d.security.allowed_domains),
                blocked_user_agents: env
                    .list("BLOCKED_USER_AGENTS", d.security.blocked_user_agents),
                max_concurrent_jobs: env
                    .parse("MAX_CONCURRENT_JOBS", d.security.max_concurrent_jobs)
                    .max(1),
                enable_cors: env.parse("ENABLE_CORS", d.security.enable_cors),
            },
            upstream: UpstreamConfig {
                wayback_url: env.string("WAYBACK_URL", d.upstream.wayback_url),
                crtsh_url: env.string("CRTSH_URL", d.upstream.crtsh_url),
                search_url: env.string("SEARCH_URL", d.upstream.search_url),
            },
            zone: ZoneConfig {
                port: env.parse("ZONE_PORT", d.zone.port),
                connect_timeout: env.duration("ZONE_CONNECT_TIMEOUT", d.zone.connect_timeout),
            },
            stream: StreamConfig {
                queue_capacity: env
                    .parse("STREAM_QUEUE_CAPACITY", d.stream.queue_capacity)
                    .max(1),
            },
        }
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: String) -> String {
        self.get(key).unwrap_or(default)
    }

    fn parse<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + Debug,
    {
        match self.get(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(key, value = %raw, ?default, "Ignoring unparseable setting.");
                default
            }),
            None => default,
        }
    }

    fn duration(&self, key: &str, default: Duration) -> Duration {
        match self.get(key) {
            Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
                warn!(key, value = %raw, ?default, "Ignoring unparseable duration.");
                default
            }),
            None => default,
        }
    }

    fn list(&self, key: &str, default: Vec<String>) -> Vec<String> {
        match self.get(key) {
            Some(raw) => raw
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            None => default,
        }
    }
}

/// Accepts `250ms`, `30s`, `5m`, `1h` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;
    match unit.trim() {
        "" | "s" => Some(Duration::from_secs(value)),
        "ms" => Some(Duration::from_millis(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

mod duration_str {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.timeouts.dns, Duration::from_secs(600));
        assert_eq!(config.timeouts.zone, Duration::from_secs(120));
        assert_eq!(config.dns.concurrency, 50);
        assert_eq!(config.http.max_redirects, 3);
        assert_eq!(config.http.max_body_size, 1024 * 1024);
        assert!(config.http.skip_tls_verify);
        assert_eq!(config.stream.queue_capacity, 100);
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("TIMEOUT_WAYBACK", "90s"),
            ("DNS_SERVERS", "9.9.9.9:53, 1.0.0.1:53"),
            ("HTTP_SKIP_TLS_VERIFY", "false"),
            ("DNS_CONCURRENCY", "not-a-number"),
        ]));
        assert_eq!(config.port, 9090);
        assert_eq!(config.timeouts.wayback, Duration::from_secs(90));
        assert_eq!(config.dns.servers, vec!["9.9.9.9:53", "1.0.0.1:53"]);
        assert!(!config.http.skip_tls_verify);
        assert_eq!(config.dns.concurrency, 50);
    }

    #[test]
    fn durations_accept_common_units() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("12"), Some(Duration::from_secs(12)));
        assert_eq!(parse_duration("5 parsecs"), None);
        assert_eq!(parse_duration(&format!("{}h", u64::MAX)), None);
        assert_eq!(parse_duration(&format!("{}m", u64::MAX / 2)), None);
    }

    #[test]
    fn allow_list_matches_on_suffix() {
        let mut security = Config::default().security;
        assert!(security.is_allowed("anything.test"));
        security.allowed_domains = vec!["example.com".to_string()];
        assert!(security.is_allowed("api.example.com"));
        assert!(security.is_allowed("example.com"));
        assert!(!security.is_allowed("badexample.com"));
    }
}
