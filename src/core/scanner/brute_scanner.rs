// src/core/scanner/brute_scanner.rs

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::wordlist;
use super::{ScanContext, ScanDeps, SourceScanner};
use crate::core::error::{DnsError, FetchError};
use crate::core::models::Source;
use crate::core::resolver::Resolve;

/// Resolves `word.target` for every word of the built-in wordlist.
pub struct BruteForceScanner {
    deps: ScanDeps,
}

impl BruteForceScanner {
    pub fn new(deps: ScanDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl SourceScanner for BruteForceScanner {
    fn source(&self) -> Source {
        Source::Dns
    }

    async fn scan(&self, ctx: &mut ScanContext) -> Result<(), FetchError> {
        let target = ctx.target().to_string();
        let candidates: Vec<String> = wordlist::flattened()
            .into_iter()
            .map(|word| format!("{word}.{target}"))
            .collect();
        info!(target = %target, candidates = candidates.len(), "Starting DNS brute force.");

        resolve_all(
            ctx,
            Arc::clone(&self.deps.resolver),
            candidates,
            self.deps.config.dns.concurrency,
        )
        .await?;

        info!(target = %target, found = ctx.found(), "DNS brute force finished.");
        Ok(())
    }
}

/// Resolves `candidates` with at most `concurrency` queries in flight and
/// emits every name that answers with at least one address.
///
/// A failed query only drops its candidate. Cancellation stops new queries
/// from being issued and aborts the ones still running.
pub async fn resolve_all(
    ctx: &mut ScanContext,
    resolver: Arc<dyn Resolve>,
    candidates: Vec<String>,
    concurrency: usize,
) -> Result<(), FetchError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<(String, Result<usize, DnsError>)> = JoinSet::new();

    for candidate in candidates {
        if ctx.is_cancelled() {
            tasks.abort_all();
            return Ok(());
        }
        let Some(Ok(permit)) = ctx.interruptible(Arc::clone(&semaphore).acquire_owned()).await else {
            tasks.abort_all();
            return Ok(());
        };

        let resolver = Arc::clone(&resolver);
        tasks.spawn(async move {
            let _permit = permit;
            let answer = resolver.lookup_host(&candidate).await.map(|ips| ips.len());
            (candidate, answer)
        });

        while let Some(joined) = tasks.try_join_next() {
            handle(ctx, joined).await?;
        }
    }

    loop {
        if ctx.is_cancelled() {
            tasks.abort_all();
            return Ok(());
        }
        let next = ctx.interruptible(tasks.join_next()).await;
        match next {
            Some(Some(joined)) => handle(ctx, joined).await?,
            Some(None) => break,
            None => {
                tasks.abort_all();
                return Ok(());
            }
        }
    }
    Ok(())
}

async fn handle(
    ctx: &mut ScanContext,
    joined: Result<(String, Result<usize, DnsError>), tokio::task::JoinError>,
) -> Result<(), FetchError> {
    match joined {
        Ok((candidate, Ok(addresses))) => {
            debug!(host = %candidate, addresses, "Candidate resolved.");
            ctx.emit(candidate).await?;
        }
        Ok((_, Err(e))) => debug!(error = %e, "Candidate dropped."),
        Err(e) => debug!(error = %e, "Resolution task ended abnormally."),
    }
    Ok(())
}
