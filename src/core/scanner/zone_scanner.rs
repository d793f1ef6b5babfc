// src/core/scanner/zone_scanner.rs

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{ScanContext, ScanDeps, SourceScanner};
use crate::core::error::FetchError;
use crate::core::models::Source;

/// Checks which of the target's authoritative nameservers accept TCP on the
/// DNS port. A reachable nameserver is reported as a result; no zone data is
/// requested.
pub struct ZoneScanner {
    deps: ScanDeps,
}

impl ZoneScanner {
    pub fn new(deps: ScanDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl SourceScanner for ZoneScanner {
    fn source(&self) -> Source {
        Source::Zone
    }

    async fn scan(&self, ctx: &mut ScanContext) -> Result<(), FetchError> {
        let target = ctx.target().to_string();
        info!(target = %target, "Starting nameserver reachability scan.");

        let Some(lookup) = ctx.interruptible(self.deps.resolver.lookup_ns(&target)).await else {
            return Ok(());
        };
        let nameservers = lookup?;
        ctx.notice(format!("Found {} nameservers for {}", nameservers.len(), target))
            .await?;

        let port = self.deps.config.zone.port;
        let connect_timeout = self.deps.config.zone.connect_timeout;
        for ns in nameservers {
            if ctx.is_cancelled() {
                return Ok(());
            }
            ctx.notice(format!("Testing nameserver {ns}")).await?;

            let attempt = timeout(connect_timeout, TcpStream::connect((ns.as_str(), port)));
            let Some(attempt) = ctx.interruptible(attempt).await else {
                return Ok(());
            };
            match attempt {
                Ok(Ok(_stream)) => {
                    info!(target = %target, nameserver = %ns, port, "Nameserver reachable over TCP.");
                    ctx.emit(ns).await?;
                }
                Ok(Err(e)) => {
                    warn!(target = %target, nameserver = %ns, error = %e, "Nameserver connection failed.");
                    ctx.notice(format!("Failed to connect to {ns}: {e}")).await?;
                }
                Err(_) => {
                    warn!(target = %target, nameserver = %ns, "Nameserver connection timed out.");
                    ctx.notice(format!("Failed to connect to {ns}: connection timed out"))
                        .await?;
                }
            }
        }

        info!(target = %target, found = ctx.found(), "Nameserver reachability scan finished.");
        Ok(())
    }
}
