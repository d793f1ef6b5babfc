// src/api/middleware.rs

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::error::ApiError;
use crate::app::AppState;

/// Logs every request once it has been answered and counts it.
pub async fn log_requests(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    state.stats.record_request();
    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Request handled."
    );
    response
}

/// Adds the fixed security headers and, when enabled, permissive CORS.
/// CORS preflights are answered here without reaching a handler.
pub async fn security_headers(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let cors = state.config.security.enable_cors;
    let mut response = if cors && request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    if cors {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        );
    }
    response
}

/// Rejects clients whose `User-Agent` contains a blocked fragment.
pub async fn block_user_agents(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();

    if let Some(blocked) = state
        .config
        .security
        .blocked_user_agents
        .iter()
        .find(|fragment| agent.contains(&fragment.to_lowercase()))
    {
        warn!(user_agent = %agent, matched = %blocked, "Blocked user agent.");
        return Err(ApiError::Forbidden("Blocked user agent".to_string()));
    }
    Ok(next.run(request).await)
}

/// Takes one token from the shared bucket, or answers 429 after the grace
/// window.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(e) = state.limiter.acquire().await {
        debug!(path = %request.uri().path(), "Rate limited.");
        return Err(e.into());
    }
    Ok(next.run(request).await)
}
