// src/core/scanner/mod.rs

// One module per discovery source, plus the HTTP prober and the static
// wordlist tables they draw on.
pub mod archive_scanner;
pub mod brute_scanner;
pub mod crtsh_scanner;
pub mod permute_scanner;
pub mod probe;
pub mod search_scanner;
pub mod wordlist;
pub mod zone_scanner;

use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{Config, HttpConfig};
use crate::core::error::FetchError;
use crate::core::models::{ScanEvent, Source};
use crate::core::registry::JobControl;
use crate::core::resolver::Resolve;
use crate::core::stats::Statistics;

use self::archive_scanner::ArchiveScanner;
use self::brute_scanner::BruteForceScanner;
use self::crtsh_scanner::CrtShScanner;
use self::permute_scanner::PermutationScanner;
use self::search_scanner::SearchScanner;
use self::zone_scanner::ZoneScanner;

/// A discovery technique producing candidate hosts for one job.
///
/// Implementations push results through [`ScanContext::emit`] and must check
/// [`ScanContext::is_cancelled`] on every iteration of their work loop. When
/// cancelled they simply return `Ok(())`; the caller decides how the job ended.
#[async_trait]
pub trait SourceScanner: Send + Sync {
    fn source(&self) -> Source;

    async fn scan(&self, ctx: &mut ScanContext) -> Result<(), FetchError>;
}

/// Shared collaborators handed to every scanner.
#[derive(Clone)]
pub struct ScanDeps {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub resolver: Arc<dyn Resolve>,
}

/// Builds the scanner implementing `source`.
pub fn scanner_for(source: Source, deps: &ScanDeps) -> Box<dyn SourceScanner> {
    let deps = deps.clone();
    match source {
        Source::Wayback => Box::new(ArchiveScanner::new(deps)),
        Source::Crtsh => Box::new(CrtShScanner::new(deps)),
        Source::Dns => Box::new(BruteForceScanner::new(deps)),
        Source::Search => Box::new(SearchScanner::new(deps)),
        Source::Permute => Box::new(PermutationScanner::new(deps)),
        Source::Zone => Box::new(ZoneScanner::new(deps)),
    }
}

/// Client used for the passive upstream APIs (archive, certificate log,
/// search engine). Certificates are always verified here.
pub fn upstream_client(config: &HttpConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Per-job emission state: the dedup set and the queue towards the client.
pub struct ScanContext {
    job: Arc<JobControl>,
    tx: mpsc::Sender<ScanEvent>,
    seen: HashSet<String>,
    stats: Arc<Statistics>,
}

impl ScanContext {
    pub fn new(job: Arc<JobControl>, tx: mpsc::Sender<ScanEvent>, stats: Arc<Statistics>) -> Self {
        Self {
            job,
            tx,
            seen: HashSet::new(),
            stats,
        }
    }

    pub fn target(&self) -> &str {
        self.job.target()
    }

    pub fn is_cancelled(&self) -> bool {
        self.job.is_cancelled() || self.tx.is_closed()
    }

    /// Number of distinct results delivered to the queue so far.
    pub fn found(&self) -> u64 {
        self.job.found()
    }

    /// Runs `fut` unless the job is cancelled first, in which case `None`.
    pub async fn interruptible<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.job.token().cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Sends `host` to the client unless it was already emitted by this job.
    ///
    /// Returns whether the host was new.
    pub async fn emit(&mut self, host: String) -> Result<bool, FetchError> {
        if self.seen.contains(&host) {
            return Ok(false);
        }
        self.seen.insert(host.clone());
        debug!(target = %self.job.target(), source = %self.job.source(), host = %host, "Discovered host.");

        match self.interruptible(self.tx.send(ScanEvent::Host(host))).await {
            Some(Ok(())) => {
                self.job.record_found();
                self.stats.record_subdomain();
                Ok(true)
            }
            Some(Err(_)) => Err(FetchError::Closed),
            // Cancelled while the queue was full; the host is dropped with the job.
            None => Ok(true),
        }
    }

    /// Progress information for the client that is not a result.
    pub async fn notice(&self, message: impl Into<String>) -> Result<(), FetchError> {
        match self.interruptible(self.tx.send(ScanEvent::Notice(message.into()))).await {
            Some(Err(_)) => Err(FetchError::Closed),
            _ => Ok(()),
        }
    }
}

/// Lowercases a raw host and strips everything that is not the host name:
/// wildcard labels, userinfo, port, query, fragment and the root dot.
pub fn normalize_host(raw: &str) -> String {
    let mut host = raw.trim().to_lowercase();
    if let Some(at) = host.rfind('@') {
        host = host[at + 1..].to_string();
    }
    if let Some(end) = host.find(['?', '#', ':']) {
        host.truncate(end);
    }
    while let Some(rest) = host.strip_prefix("*.") {
        host = rest.to_string();
    }
    host.trim_end_matches('.').to_string()
}

/// `true` when `host` lies strictly below `target`.
pub fn is_subdomain_of(host: &str, target: &str) -> bool {
    host.len() > target.len() + 1
        && host.ends_with(target)
        && host.as_bytes()[host.len() - target.len() - 1] == b'.'
}
