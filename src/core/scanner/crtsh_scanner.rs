// src/core/scanner/crtsh_scanner.rs

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use tracing::{info, warn};

use super::{is_subdomain_of, normalize_host, ScanContext, ScanDeps, SourceScanner};
use crate::core::error::FetchError;
use crate::core::models::Source;

/// One row of the certificate-transparency search output. Only the SAN list
/// is of interest; every other column is ignored.
#[derive(Debug, Deserialize)]
pub struct CrtShEntry {
    #[serde(default)]
    pub name_value: Option<String>,
}

/// Collects names from certificates logged for `%.target`.
pub struct CrtShScanner {
    deps: ScanDeps,
}

impl CrtShScanner {
    pub fn new(deps: ScanDeps) -> Self {
        Self { deps }
    }
}

/// Candidate hosts of one certificate entry, in document order.
///
/// `name_value` holds newline-separated names; wildcards are reduced to their
/// base name and the apex itself is dropped.
pub fn hosts_from_entry<'a>(entry: &'a CrtShEntry, target: &'a str) -> impl Iterator<Item = String> + 'a {
    entry
        .name_value
        .as_deref()
        .unwrap_or_default()
        .split('\n')
        .map(normalize_host)
        .filter(move |host| is_subdomain_of(host, target))
}

#[async_trait]
impl SourceScanner for CrtShScanner {
    fn source(&self) -> Source {
        Source::Crtsh
    }

    async fn scan(&self, ctx: &mut ScanContext) -> Result<(), FetchError> {
        let target = ctx.target().to_string();
        info!(target = %target, "Starting certificate transparency scan.");

        let request = self
            .deps
            .http
            .get(&self.deps.config.upstream.crtsh_url)
            .query(&[("q", format!("%.{target}")), ("output", "json".to_string())])
            .header(ACCEPT, "application/json")
            .send();
        let Some(response) = ctx.interruptible(request).await else {
            return Ok(());
        };
        let response = response.map_err(|e| {
            warn!(target = %target, error = %e, "Certificate log request failed.");
            FetchError::Request(e)
        })?;

        if !response.status().is_success() {
            warn!(target = %target, status = %response.status(), "Certificate log returned an error status.");
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("json") {
            warn!(target = %target, content_type = %content_type, "Certificate log did not answer with JSON.");
            return Err(FetchError::ContentType(content_type));
        }

        let Some(body) = ctx.interruptible(response.bytes()).await else {
            return Ok(());
        };
        let body = body?;
        let entries: Vec<CrtShEntry> = serde_json::from_slice(&body).map_err(|e| {
            warn!(target = %target, error = %e, "Certificate log JSON could not be decoded.");
            FetchError::Decode(e.to_string())
        })?;
        info!(target = %target, entries = entries.len(), "Certificate log entries received.");

        for entry in &entries {
            if ctx.is_cancelled() {
                return Ok(());
            }
            for host in hosts_from_entry(entry, &target) {
                ctx.emit(host).await?;
            }
        }

        info!(target = %target, found = ctx.found(), "Certificate transparency scan finished.");
        Ok(())
    }
}
