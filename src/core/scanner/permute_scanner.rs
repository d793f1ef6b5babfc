// src/core/scanner/permute_scanner.rs

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::brute_scanner::resolve_all;
use super::wordlist;
use super::{ScanContext, ScanDeps, SourceScanner};
use crate::core::error::FetchError;
use crate::core::models::Source;

/// Resolves common environment and numbering variants of the target.
/// Runs with its own, usually smaller, concurrency limit.
pub struct PermutationScanner {
    deps: ScanDeps,
}

impl PermutationScanner {
    pub fn new(deps: ScanDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl SourceScanner for PermutationScanner {
    fn source(&self) -> Source {
        Source::Permute
    }

    async fn scan(&self, ctx: &mut ScanContext) -> Result<(), FetchError> {
        let target = ctx.target().to_string();
        let candidates = wordlist::permutations(&target);
        info!(target = %target, candidates = candidates.len(), "Starting permutation scan.");

        resolve_all(
            ctx,
            Arc::clone(&self.deps.resolver),
            candidates,
            self.deps.config.dns.permute_concurrency,
        )
        .await?;

        info!(target = %target, found = ctx.found(), "Permutation scan finished.");
        Ok(())
    }
}
