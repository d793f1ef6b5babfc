// src/api/handlers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::error::ApiError;
use super::sse::into_sse;
use crate::app::AppState;
use crate::config::Config;
use crate::core::models::{JobSnapshot, ProbeResult, Source, TargetStatus, CONNECTION_FAILED};
use crate::core::resolver::Resolve;
use crate::core::scanner::wordlist;
use crate::core::stats::StatsSnapshot;

/// Lowercase domain names the stream endpoints accept. Labels may not start
/// or end with a hyphen; the TLD is alphabetic or punycode.
static RE_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+([a-z]{2,63}|xn--[a-z0-9-]{1,59})$")
        .unwrap()
});

#[derive(Debug, Deserialize)]
pub struct TargetQuery {
    pub target: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProbeQuery {
    pub url: Option<String>,
}

/// Lowercased, dot-trimmed target, or 400.
pub fn validate_target(raw: Option<&str>) -> Result<String, ApiError> {
    let target = raw
        .map(|t| t.trim().trim_end_matches('.').to_lowercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing target parameter".to_string()))?;
    if target.len() > 253 || !RE_DOMAIN.is_match(&target) {
        return Err(ApiError::BadRequest(format!("invalid target domain: {target}")));
    }
    Ok(target)
}

fn ensure_allowed(config: &Config, host: &str) -> Result<(), ApiError> {
    if config.security.is_allowed(host) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("domain {host} not in allowed list")))
    }
}

/// `GET /api/{source}/stream?target=`: server-sent events for one job.
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    Query(query): Query<TargetQuery>,
) -> Result<Response, ApiError> {
    let source = Source::from_str(&source)
        .map_err(|_| ApiError::NotFound(format!("unknown source: {source}")))?;
    let target = validate_target(query.target.as_deref())?;
    ensure_allowed(&state.config, &target)?;

    let stream = state.publisher.start(&target, source)?;
    info!(target = %target, %source, job = %stream.job_id, "Stream opened.");
    Ok(into_sse(stream).into_response())
}

/// `GET /api/probe?url=`: one liveness check. A bare host gets HTTPS first
/// and HTTP as fallback.
pub async fn probe(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProbeQuery>,
) -> Result<Json<ProbeResult>, ApiError> {
    let raw = query
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing url parameter".to_string()))?;

    let result = if raw.contains("://") {
        match Url::parse(&raw) {
            Ok(url) => {
                let host = url.host_str().unwrap_or_default().to_lowercase();
                if state.config.security.is_allowed(&host) {
                    state.prober.probe(&raw).await
                } else {
                    not_allowed(&raw, &host)
                }
            }
            Err(e) => ProbeResult::failure(&raw, CONNECTION_FAILED, format!("invalid URL: {e}")),
        }
    } else {
        let host = raw.trim_end_matches('/').to_lowercase();
        if state.config.security.is_allowed(&host) {
            state.prober.probe_host(&host).await
        } else {
            not_allowed(&raw, &host)
        }
    };

    state.stats.record_probe(result.is_success());
    Ok(Json(result))
}

fn not_allowed(raw: &str, host: &str) -> ProbeResult {
    warn!(url = %raw, host = %host, "Probe target outside the allow-list.");
    ProbeResult::failure(
        raw,
        CONNECTION_FAILED,
        format!("domain not allowed: domain {host} not in allowed list"),
    )
}

/// `POST /api/abort?target=`: cancels every job of the target.
pub async fn abort(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TargetQuery>,
) -> Result<StatusCode, ApiError> {
    let target = validate_target(query.target.as_deref())?;
    let cancelled = state.registry.abort(&target);
    info!(target = %target, cancelled, "Abort requested.");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/status?target=`
pub async fn status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TargetQuery>,
) -> Result<Json<TargetStatus>, ApiError> {
    let target = validate_target(query.target.as_deref())?;
    Ok(Json(state.registry.status(&target)))
}

pub async fn jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSnapshot>> {
    Json(state.registry.jobs())
}

pub async fn job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state
        .registry
        .job(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job not found: {id}")))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

#[derive(Debug, Serialize)]
pub struct ConfigView<'a> {
    #[serde(flatten)]
    pub config: &'a Config,
    pub wordlist_categories: BTreeMap<&'static str, usize>,
}

pub async fn config(State(state): State<Arc<AppState>>) -> Response {
    Json(ConfigView {
        config: &state.config,
        wordlist_categories: wordlist::category_sizes(),
    })
    .into_response()
}

#[derive(Debug, Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub platform: String,
    pub uptime_seconds: f64,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub async fn version(State(state): State<Arc<AppState>>) -> Json<VersionInfo> {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        uptime_seconds: state.stats.uptime_seconds(),
        start_time: state.stats.start_time(),
    })
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.stats.uptime_seconds(),
    }))
}

/// Name resolved by the readiness check.
pub const READINESS_HOST: &str = "google.com";

/// `GET /ready`: 200 when the DNS pool answers within two seconds, 503 otherwise.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let lookup = state.resolver.lookup_host(READINESS_HOST);
    let dns = match tokio::time::timeout(Duration::from_secs(2), lookup).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "Readiness DNS check failed.");
            false
        }
        Err(_) => {
            warn!("Readiness DNS check timed out.");
            false
        }
    };
    let status = if dns {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({ "ready": dns, "checks": { "dns": dns } })),
    )
}
