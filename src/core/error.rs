// src/core/error.rs

use thiserror::Error;

/// Failure of a single DNS query. Always per-candidate: callers drop the
/// candidate, they never fail the enclosing job because of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("DNS query failed for {host}: {reason}")]
    Query { host: String, reason: String },

    #[error("no A records found for {0}")]
    NoRecords(String),

    #[error("no nameservers found for {0}")]
    NoNameservers(String),
}

/// Fetcher-level failure. The stream publisher turns every one of these into
/// a "completed with errors" terminal event.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("unexpected content type: {0}")]
    ContentType(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Dns(#[from] DnsError),

    /// The consumer side of the stream is gone.
    #[error("stream consumer disconnected")]
    Closed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("too many concurrent jobs (limit {0})")]
    TooManyJobs(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rate limit exceeded")]
pub struct RateLimitError;
