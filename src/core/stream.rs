// src/core/stream.rs

//! Drives one fetcher per job and turns it into an ordered event stream:
//! zero or more hosts and notices, then exactly one terminal event.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::error::{FetchError, RegistryError};
use crate::core::models::{CancelReason, ScanEvent, ScanOutcome, Source};
use crate::core::registry::{JobControl, JobRegistry};
use crate::core::scanner::{scanner_for, ScanContext, ScanDeps, SourceScanner};
use crate::core::stats::Statistics;

/// Receiving half of a started job.
#[derive(Debug)]
pub struct ScanStream {
    pub job_id: String,
    pub source: Source,
    pub events: mpsc::Receiver<ScanEvent>,
}

pub struct StreamPublisher {
    deps: ScanDeps,
    registry: Arc<JobRegistry>,
    stats: Arc<Statistics>,
}

impl StreamPublisher {
    pub fn new(deps: ScanDeps, registry: Arc<JobRegistry>, stats: Arc<Statistics>) -> Self {
        Self {
            deps,
            registry,
            stats,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Starts `source` against `target` with the configured timeout.
    ///
    /// Any job already running for the same pair is superseded.
    pub fn start(&self, target: &str, source: Source) -> Result<ScanStream, RegistryError> {
        let timeout = self.deps.config.timeouts.for_source(source);
        self.start_with(target, scanner_for(source, &self.deps), timeout)
    }

    /// Starts an arbitrary scanner. The job is registered before this
    /// returns; the fetcher itself runs on a spawned task.
    pub fn start_with(
        &self,
        target: &str,
        scanner: Box<dyn SourceScanner>,
        timeout: Duration,
    ) -> Result<ScanStream, RegistryError> {
        let source = scanner.source();
        let job = self.registry.register(target, source)?;
        self.stats.job_started(source);

        let (tx, events) = mpsc::channel(self.deps.config.stream.queue_capacity.max(1));
        let stream = ScanStream {
            job_id: job.id().to_string(),
            source,
            events,
        };
        info!(target, %source, job = %job.id(), timeout = ?timeout, "Starting stream.");

        tokio::spawn(drive(
            scanner,
            job,
            tx,
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            timeout,
        ));
        Ok(stream)
    }
}

async fn drive(
    scanner: Box<dyn SourceScanner>,
    job: Arc<JobControl>,
    tx: mpsc::Sender<ScanEvent>,
    registry: Arc<JobRegistry>,
    stats: Arc<Statistics>,
    timeout: Duration,
) {
    let mut ctx = ScanContext::new(Arc::clone(&job), tx.clone(), Arc::clone(&stats));

    let result = tokio::select! {
        biased;
        _ = job.token().cancelled() => None,
        _ = tokio::time::sleep(timeout) => {
            job.cancel(CancelReason::Deadline);
            None
        }
        _ = tx.closed() => {
            job.cancel(CancelReason::Aborted);
            None
        }
        result = scanner.scan(&mut ctx) => Some(result),
    };

    let found = ctx.found();
    let outcome = match result {
        Some(Err(FetchError::Closed)) => {
            job.cancel(CancelReason::Aborted);
            cancelled(&job, found)
        }
        _ if job.is_cancelled() => cancelled(&job, found),
        Some(Ok(())) => ScanOutcome::Completed { found },
        Some(Err(e)) => {
            warn!(target = %job.target(), source = %job.source(), job = %job.id(), error = %e, "Fetcher failed.");
            ScanOutcome::Failed {
                found,
                reason: e.to_string(),
            }
        }
        None => cancelled(&job, found),
    };

    registry.release(&job);
    stats.job_finished(job.source(), outcome.status(), found);
    info!(
        target = %job.target(),
        source = %job.source(),
        job = %job.id(),
        status = %outcome.status(),
        found,
        "Stream finished."
    );

    if tx.send(ScanEvent::Finished(outcome)).await.is_err() {
        debug!(job = %job.id(), "Client gone before the terminal event.");
    }
}

fn cancelled(job: &JobControl, found: u64) -> ScanOutcome {
    ScanOutcome::Cancelled {
        found,
        reason: job.cancel_reason().unwrap_or(CancelReason::Aborted),
    }
}
