// src/core/registry.rs

//! Process-wide table of running discovery jobs, keyed by `(target, source)`.
//!
//! Every operation runs under one mutex and none of them await, so the lock is
//! never held across network I/O. Cancelling a job only flips its token; the
//! fetcher driving it notices at its next loop iteration.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::error::RegistryError;
use crate::core::models::{CancelReason, JobSnapshot, JobStatus, Source, TargetStatus};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub target: String,
    pub source: Source,
}

/// Shared control block of one job.
///
/// The registry owns it while the job is registered; the stream publisher
/// holds a clone while driving the fetcher.
#[derive(Debug)]
pub struct JobControl {
    id: String,
    key: JobKey,
    started_at: DateTime<Utc>,
    token: CancellationToken,
    reason: OnceLock<CancelReason>,
    found: AtomicU64,
}

impl JobControl {
    fn new(id: String, key: JobKey) -> Self {
        Self {
            id,
            key,
            started_at: Utc::now(),
            token: CancellationToken::new(),
            reason: OnceLock::new(),
            found: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &str {
        &self.key.target
    }

    pub fn source(&self) -> Source {
        self.key.source
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancels the job. The first reason given is the one that sticks.
    pub fn cancel(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    pub fn record_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            target: self.key.target.clone(),
            source: self.key.source,
            started_at: self.started_at,
            status: if self.is_cancelled() {
                JobStatus::Cancelled
            } else {
                JobStatus::Running
            },
            found: self.found(),
        }
    }
}

#[derive(Debug)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobKey, Arc<JobControl>>>,
    max_jobs: usize,
    sequence: AtomicU64,
}

impl JobRegistry {
    pub fn new(max_jobs: usize) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            max_jobs: max_jobs.max(1),
            sequence: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobKey, Arc<JobControl>>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Installs a new job for `(target, source)`.
    ///
    /// A job already running under the same key is cancelled first and
    /// replaced; replacing does not count against the concurrency limit.
    pub fn register(&self, target: &str, source: Source) -> Result<Arc<JobControl>, RegistryError> {
        let key = JobKey {
            target: target.to_string(),
            source,
        };
        let mut jobs = self.lock();

        if let Some(previous) = jobs.remove(&key) {
            previous.cancel(CancelReason::Superseded);
            info!(target, %source, job = %previous.id, "Superseded running job.");
        } else if jobs.len() >= self.max_jobs {
            return Err(RegistryError::TooManyJobs(self.max_jobs));
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let job = Arc::new(JobControl::new(format!("{target}_{source}_{seq}"), key.clone()));
        jobs.insert(key, Arc::clone(&job));
        debug!(target, %source, job = %job.id, "Registered job.");
        Ok(job)
    }

    /// Removes `job` if it still owns its slot. Returns `false` when it was
    /// already superseded or aborted.
    pub fn release(&self, job: &JobControl) -> bool {
        let mut jobs = self.lock();
        match jobs.get(&job.key) {
            Some(current) if current.id == job.id => {
                jobs.remove(&job.key);
                true
            }
            _ => false,
        }
    }

    /// Cancels and removes every job for `target`, whatever its source.
    pub fn abort(&self, target: &str) -> usize {
        let mut jobs = self.lock();
        let keys: Vec<JobKey> = jobs
            .keys()
            .filter(|key| key.target == target)
            .cloned()
            .collect();
        for key in &keys {
            if let Some(job) = jobs.remove(key) {
                job.cancel(CancelReason::Aborted);
            }
        }
        info!(target, cancelled = keys.len(), "Aborted jobs for target.");
        keys.len()
    }

    pub fn status(&self, target: &str) -> TargetStatus {
        let jobs = self.lock();
        let mut sources: Vec<Source> = jobs
            .keys()
            .filter(|key| key.target == target)
            .map(|key| key.source)
            .collect();
        sources.sort();
        TargetStatus {
            target: target.to_string(),
            active: !sources.is_empty(),
            sources,
        }
    }

    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> = self.lock().values().map(|job| job.snapshot()).collect();
        snapshots.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        snapshots
    }

    pub fn job(&self, id: &str) -> Option<JobSnapshot> {
        self.lock()
            .values()
            .find(|job| job.id == id)
            .map(|job| job.snapshot())
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_supersedes_previous_job_for_same_key() {
        let registry = JobRegistry::new(8);
        let first = registry.register("example.com", Source::Dns).unwrap();
        let second = registry.register("example.com", Source::Dns).unwrap();

        assert!(first.is_cancelled());
        assert_eq!(first.cancel_reason(), Some(CancelReason::Superseded));
        assert!(!second.is_cancelled());
        assert_ne!(first.id(), second.id());
        assert_eq!(registry.active_count(), 1);

        // The superseded job must not evict its replacement.
        assert!(!registry.release(&first));
        assert_eq!(registry.active_count(), 1);
        assert!(registry.release(&second));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn abort_only_touches_matching_target() {
        let registry = JobRegistry::new(8);
        let a1 = registry.register("a.test", Source::Crtsh).unwrap();
        let a2 = registry.register("a.test", Source::Wayback).unwrap();
        let b = registry.register("b.test", Source::Crtsh).unwrap();

        assert_eq!(registry.abort("a.test"), 2);
        assert!(a1.is_cancelled() && a2.is_cancelled());
        assert_eq!(a1.cancel_reason(), Some(CancelReason::Aborted));
        assert!(!b.is_cancelled());
        assert_eq!(registry.status("a.test").active, false);
        assert_eq!(registry.status("b.test").sources, vec![Source::Crtsh]);
        assert_eq!(registry.abort("nothing.test"), 0);
    }

    #[test]
    fn limit_applies_to_new_keys_only() {
        let registry = JobRegistry::new(1);
        let _first = registry.register("a.test", Source::Dns).unwrap();
        assert_eq!(
            registry.register("a.test", Source::Zone).unwrap_err(),
            RegistryError::TooManyJobs(1)
        );
        assert!(registry.register("a.test", Source::Dns).is_ok());
    }

    #[test]
    fn status_lists_sources_in_stable_order() {
        let registry = JobRegistry::new(8);
        registry.register("a.test", Source::Zone).unwrap();
        registry.register("a.test", Source::Wayback).unwrap();
        let status = registry.status("a.test");
        assert!(status.active);
        assert_eq!(status.sources, vec![Source::Wayback, Source::Zone]);
    }

    #[test]
    fn concurrent_registration_leaves_one_live_job_per_key() {
        let registry = Arc::new(JobRegistry::new(64));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.register("race.test", Source::Permute).unwrap())
            })
            .collect();
        let jobs: Vec<Arc<JobControl>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(jobs.iter().filter(|job| !job.is_cancelled()).count(), 1);
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn job_lookup_by_id() {
        let registry = JobRegistry::new(8);
        let job = registry.register("a.test", Source::Search).unwrap();
        job.record_found();
        let snapshot = registry.job(job.id()).unwrap();
        assert_eq!(snapshot.found, 1);
        assert_eq!(snapshot.status, JobStatus::Running);
        assert!(registry.job("missing").is_none());
    }
}
