// src/api/mod.rs

//! HTTP surface: routing, middleware and the SSE encoding of job streams.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod sse;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Full application router.
///
/// `/api/*` is rate limited and user-agent filtered; the health endpoints are
/// not. Every route gets the security headers and the request log.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/:source/stream", get(handlers::stream))
        .route("/api/probe", get(handlers::probe))
        .route("/api/abort", post(handlers::abort))
        .route("/api/status", get(handlers::status))
        .route("/api/jobs", get(handlers::jobs))
        .route("/api/jobs/:id", get(handlers::job))
        .route("/api/stats", get(handlers::stats))
        .route("/api/config", get(handlers::config))
        .route("/api/version", get(handlers::version))
        .layer(from_fn_with_state(Arc::clone(&state), middleware::rate_limit))
        .layer(from_fn_with_state(Arc::clone(&state), middleware::block_user_agents));

    Router::new()
        .merge(api)
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .layer(from_fn_with_state(Arc::clone(&state), middleware::security_headers))
        .layer(from_fn_with_state(Arc::clone(&state), middleware::log_requests))
        .with_state(state)
}
