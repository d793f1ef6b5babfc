// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// --- Discovery Sources ---

/// One discovery technique. The string form is the `{source}` path segment of
/// the streaming API (`/api/{source}/stream`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Source {
    Wayback,
    Crtsh,
    Dns,
    Search,
    Permute,
    Zone,
}

impl Source {
    /// Human-readable label used in terminal stream messages.
    pub fn label(&self) -> &'static str {
        match self {
            Source::Wayback => "Wayback",
            Source::Crtsh => "Certificate transparency",
            Source::Dns => "DNS brute force",
            Source::Search => "Search engine",
            Source::Permute => "Permutation",
            Source::Zone => "Zone transfer",
        }
    }

    /// What the emitted results of this source are counted as.
    pub fn unit(&self) -> &'static str {
        match self {
            Source::Zone => "nameservers",
            _ => "hosts",
        }
    }
}

// --- Jobs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Point-in-time view of a registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: String,
    pub target: String,
    pub source: Source,
    pub started_at: DateTime<Utc>,
    pub status: JobStatus,
    pub found: u64,
}

/// Answer of `GET /api/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetStatus {
    pub target: String,
    pub active: bool,
    pub sources: Vec<Source>,
}

// --- Stream Events ---

/// Why a job stopped before its fetcher finished on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CancelReason {
    /// Another stream request for the same target and source took over.
    Superseded,
    /// An explicit abort for the target, or the client went away.
    Aborted,
    /// The per-source timeout elapsed.
    Deadline,
}

/// How a job ended. Exactly one is produced per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed { found: u64 },
    Failed { found: u64, reason: String },
    Cancelled { found: u64, reason: CancelReason },
}

impl ScanOutcome {
    pub fn found(&self) -> u64 {
        match self {
            ScanOutcome::Completed { found }
            | ScanOutcome::Failed { found, .. }
            | ScanOutcome::Cancelled { found, .. } => *found,
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            ScanOutcome::Completed { .. } => JobStatus::Completed,
            ScanOutcome::Failed { .. } => JobStatus::Failed,
            ScanOutcome::Cancelled { .. } => JobStatus::Cancelled,
        }
    }

    /// The terminal message shown to the client.
    pub fn message(&self, source: Source) -> String {
        let (label, unit) = (source.label(), source.unit());
        match self {
            ScanOutcome::Completed { found } => {
                format!("{label} scan completed - found {found} {unit}")
            }
            ScanOutcome::Failed { found, reason } => {
                format!("{label} scan completed with errors - found {found} {unit}: {reason}")
            }
            ScanOutcome::Cancelled { found, .. } => {
                format!("{label} scan cancelled - found {found} {unit}")
            }
        }
    }
}

/// A single item travelling from a fetcher to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A newly discovered, deduplicated candidate host.
    Host(String),
    /// Progress information that is not a result.
    Notice(String),
    /// Always the last event of a stream.
    Finished(ScanOutcome),
}

// --- HTTP Probe ---

pub const NO_TITLE: &str = "No title";
pub const CONNECTION_FAILED: &str = "Connection failed";

/// Outcome of one HTTP(S) fetch against a candidate host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeResult {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub url: String,
    pub status: String,
    pub title: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub probe_time_ms: Option<u64>,
}

impl ProbeResult {
    /// A failed attempt: status `"0"` plus a human-readable error.
    pub fn failure(url: &str, title: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            status: "0".to_string(),
            title: title.to_string(),
            error: error.into(),
            probe_time_ms: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status != "0" && self.error.is_empty()
    }
}
