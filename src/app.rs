// src/app.rs

use color_eyre::eyre::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::core::limiter::RateLimiter;
use crate::core::registry::JobRegistry;
use crate::core::resolver::{DnsResolver, Resolve};
use crate::core::scanner::probe::HttpProber;
use crate::core::scanner::{upstream_client, ScanDeps};
use crate::core::stats::Statistics;
use crate::core::stream::StreamPublisher;

/// Everything a request handler can reach. Built once at startup and shared
/// behind an `Arc`; tests build their own isolated instances.
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<JobRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub resolver: Arc<dyn Resolve>,
    pub stats: Arc<Statistics>,
    pub publisher: StreamPublisher,
    pub prober: HttpProber,
}

impl AppState {
    /// Production wiring: the configured DNS pool and real HTTP clients.
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let stats = Arc::new(Statistics::new());
        let resolver: Arc<dyn Resolve> = Arc::new(DnsResolver::new(&config.dns, Arc::clone(&stats)));
        Self::with_resolver(config, resolver, stats)
    }

    /// Same as [`AppState::new`] with an injected resolver.
    pub fn with_resolver(
        config: Config,
        resolver: Arc<dyn Resolve>,
        stats: Arc<Statistics>,
    ) -> Result<Arc<Self>> {
        let config = Arc::new(config);
        let registry = Arc::new(JobRegistry::new(config.security.max_concurrent_jobs));
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        let prober = HttpProber::new(&config.http, config.timeouts.probe)?;
        let deps = ScanDeps {
            config: Arc::clone(&config),
            http: upstream_client(&config.http)?,
            resolver: Arc::clone(&resolver),
        };
        let publisher = StreamPublisher::new(deps, Arc::clone(&registry), Arc::clone(&stats));

        info!(
            max_jobs = config.security.max_concurrent_jobs,
            rps = config.rate_limit.requests_per_second,
            burst = config.rate_limit.burst_size,
            "Application state ready."
        );
        Ok(Arc::new(Self {
            config,
            registry,
            limiter,
            resolver,
            stats,
            publisher,
            prober,
        }))
    }
}
