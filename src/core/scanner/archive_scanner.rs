// src/core/scanner/archive_scanner.rs

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{is_subdomain_of, normalize_host, ScanContext, ScanDeps, SourceScanner};
use crate::core::error::FetchError;
use crate::core::models::Source;

/// Host part of an absolute http(s) URL.
static RE_URL_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://([^/\s"'<>]+)"#).unwrap());

/// Harvests hosts from the web archive's CDX index.
///
/// One request lists every archived URL under `*.target/*`, one URL per
/// line; the body is consumed chunk by chunk and parsed line by line.
pub struct ArchiveScanner {
    deps: ScanDeps,
}

impl ArchiveScanner {
    pub fn new(deps: ScanDeps) -> Self {
        Self { deps }
    }
}

/// Extracts a candidate host from one index line, if it belongs to `target`.
pub fn host_from_line(line: &str, target: &str) -> Option<String> {
    let caps = RE_URL_HOST.captures(line)?;
    let host = normalize_host(caps.get(1)?.as_str());
    is_subdomain_of(&host, target).then_some(host)
}

#[async_trait]
impl SourceScanner for ArchiveScanner {
    fn source(&self) -> Source {
        Source::Wayback
    }

    async fn scan(&self, ctx: &mut ScanContext) -> Result<(), FetchError> {
        let target = ctx.target().to_string();
        info!(target = %target, "Starting archive index scan.");

        let request = self
            .deps
            .http
            .get(&self.deps.config.upstream.wayback_url)
            .query(&[
                ("url", format!("*.{target}/*")),
                ("output", "text".to_string()),
                ("fl", "original".to_string()),
                ("collapse", "urlkey".to_string()),
            ])
            .send();
        let Some(response) = ctx.interruptible(request).await else {
            return Ok(());
        };
        let mut response = response.map_err(|e| {
            warn!(target = %target, error = %e, "Archive index request failed.");
            FetchError::Request(e)
        })?;
        if !response.status().is_success() {
            warn!(target = %target, status = %response.status(), "Archive index returned an error status.");
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let mut pending: Vec<u8> = Vec::new();
        let mut lines = 0usize;
        loop {
            if ctx.is_cancelled() {
                return Ok(());
            }
            let Some(chunk) = ctx.interruptible(response.chunk()).await else {
                return Ok(());
            };
            let chunk = chunk.map_err(|e| {
                warn!(target = %target, error = %e, "Archive index body read failed.");
                FetchError::Request(e)
            })?;

            let eof = chunk.is_none();
            if let Some(bytes) = chunk {
                pending.extend_from_slice(&bytes);
            } else if !pending.is_empty() {
                pending.push(b'\n');
            }

            while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
                if ctx.is_cancelled() {
                    return Ok(());
                }
                let line: Vec<u8> = pending.drain(..=newline).collect();
                lines += 1;
                if let Some(host) = host_from_line(&String::from_utf8_lossy(&line), &target) {
                    ctx.emit(host).await?;
                }
            }

            if eof {
                break;
            }
        }

        debug!(target = %target, lines, "Archive index fully read.");
        info!(target = %target, found = ctx.found(), "Archive index scan finished.");
        Ok(())
    }
}
