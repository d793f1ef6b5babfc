// src/core/mod.rs

// The discovery engine: job bookkeeping, the fetchers, and the plumbing that
// turns a fetcher into a client-facing stream. Nothing in here knows about HTTP
// routing; `crate::api` sits on top.

/// Data structures shared by every layer: sources, job views, stream events,
/// probe results.
pub mod models;

/// Error enums for fetchers, DNS, the registry and the rate limiter.
pub mod error;

/// DNS lookups behind a trait so fetchers can be tested without a network.
pub mod resolver;

/// The `(target, source)` job table with supersede and abort.
pub mod registry;

pub mod limiter;
pub mod stats;

/// Runs a fetcher for one job and publishes its events.
pub mod stream;

/// One fetcher per discovery source, plus the HTTP prober.
pub mod scanner;
