// src/core/stats.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::core::models::{JobStatus, Source};

/// Process-wide counters. Hot paths only touch atomics; the per-source table
/// is updated once per job start and end.
#[derive(Debug)]
pub struct Statistics {
    started: Instant,
    start_time: DateTime<Utc>,
    total_requests: AtomicU64,
    active_jobs: AtomicU64,
    completed_jobs: AtomicU64,
    failed_jobs: AtomicU64,
    cancelled_jobs: AtomicU64,
    total_subdomains: AtomicU64,
    total_probes: AtomicU64,
    successful_probes: AtomicU64,
    dns_queries: AtomicU64,
    sources: Mutex<BTreeMap<Source, SourceStats>>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SourceStats {
    pub jobs: u64,
    pub results: u64,
    pub errors: u64,
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uptime_seconds: f64,
    pub start_time: DateTime<Utc>,
    pub total_requests: u64,
    pub active_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub cancelled_jobs: u64,
    pub total_subdomains: u64,
    pub total_probes: u64,
    pub successful_probes: u64,
    pub dns_queries: u64,
    pub source_stats: BTreeMap<Source, SourceStats>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            start_time: Utc::now(),
            total_requests: AtomicU64::new(0),
            active_jobs: AtomicU64::new(0),
            completed_jobs: AtomicU64::new(0),
            failed_jobs: AtomicU64::new(0),
            cancelled_jobs: AtomicU64::new(0),
            total_subdomains: AtomicU64::new(0),
            total_probes: AtomicU64::new(0),
            successful_probes: AtomicU64::new(0),
            dns_queries: AtomicU64::new(0),
            sources: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dns_query(&self) {
        self.dns_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subdomain(&self) {
        self.total_subdomains.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe(&self, success: bool) {
        self.total_probes.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_probes.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn job_started(&self, source: Source) {
        self.active_jobs.fetch_add(1, Ordering::Relaxed);
        let mut sources = self.sources.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sources.entry(source).or_default();
        entry.jobs += 1;
        entry.last_used = Some(Utc::now());
    }

    pub fn job_finished(&self, source: Source, status: JobStatus, found: u64) {
        // Saturating so a stray double-finish can never wrap the gauge.
        let _ = self
            .active_jobs
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
        let counter = match status {
            JobStatus::Completed => &self.completed_jobs,
            JobStatus::Failed => &self.failed_jobs,
            JobStatus::Cancelled | JobStatus::Running => &self.cancelled_jobs,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let mut sources = self.sources.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sources.entry(source).or_default();
        entry.results += found;
        if status == JobStatus::Failed {
            entry.errors += 1;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let source_stats = self
            .sources
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        StatsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            start_time: self.start_time,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            completed_jobs: self.completed_jobs.load(Ordering::Relaxed),
            failed_jobs: self.failed_jobs.load(Ordering::Relaxed),
            cancelled_jobs: self.cancelled_jobs.load(Ordering::Relaxed),
            total_subdomains: self.total_subdomains.load(Ordering::Relaxed),
            total_probes: self.total_probes.load(Ordering::Relaxed),
            successful_probes: self.successful_probes.load(Ordering::Relaxed),
            dns_queries: self.dns_queries.load(Ordering::Relaxed),
            source_stats,
        }
    }
}
