// src/core/scanner/probe.rs

//! HTTP liveness checks against discovered hosts.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::redirect::Policy;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use crate::config::HttpConfig;
use crate::core::models::{ProbeResult, CONNECTION_FAILED, NO_TITLE};

static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const MAX_TITLE_CHARS: usize = 100;

/// Fetches a single URL and reports its status line and page title.
///
/// Certificate validation follows `skip_tls_verify`; redirects beyond
/// `max_redirects` are an error; at most `max_body_size` bytes of the body
/// are read.
#[derive(Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    max_body_size: usize,
}

impl HttpProber {
    pub fn new(config: &HttpConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.skip_tls_verify)
            .redirect(Policy::limited(config.max_redirects))
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            max_body_size: config.max_body_size,
        })
    }

    /// One attempt against `raw_url`. Never fails: every problem is encoded
    /// in the returned result with status `"0"`.
    pub async fn probe(&self, raw_url: &str) -> ProbeResult {
        let started = Instant::now();
        let mut result = self.fetch(raw_url).await;
        result.probe_time_ms = Some(started.elapsed().as_millis() as u64);
        debug!(url = %raw_url, status = %result.status, "Probe finished.");
        result
    }

    /// Tries `https://host` and falls back to `http://host` when the secure
    /// attempt could not produce a response.
    pub async fn probe_host(&self, host: &str) -> ProbeResult {
        let secure = self.probe(&format!("https://{host}")).await;
        if secure.is_success() {
            return secure;
        }
        info!(host, error = %secure.error, "HTTPS probe failed, retrying over HTTP.");
        self.probe(&format!("http://{host}")).await
    }

    async fn fetch(&self, raw_url: &str) -> ProbeResult {
        let url = match Url::parse(raw_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                return ProbeResult::failure(
                    raw_url,
                    CONNECTION_FAILED,
                    format!("invalid URL: unsupported scheme {}", url.scheme()),
                );
            }
            Err(e) => return ProbeResult::failure(raw_url, CONNECTION_FAILED, format!("invalid URL: {e}")),
        };

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await;
        let mut response = match response {
            Ok(response) => response,
            Err(e) => return ProbeResult::failure(raw_url, CONNECTION_FAILED, e.to_string()),
        };
        let status = response.status().as_u16().to_string();

        let mut body: Vec<u8> = Vec::new();
        while body.len() < self.max_body_size {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    let room = self.max_body_size - body.len();
                    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(url = %raw_url, status = %status, error = %e, "Probe body read failed.");
                    return ProbeResult::failure(raw_url, "Failed to read response", e.to_string());
                }
            }
        }

        ProbeResult {
            url: raw_url.to_string(),
            status,
            title: extract_title(&String::from_utf8_lossy(&body)),
            error: String::new(),
            probe_time_ms: None,
        }
    }
}

/// First `<title>` of `html`, whitespace collapsed, at most 100 characters
/// plus `...`. Entities are left as they are.
pub fn extract_title(html: &str) -> String {
    let Some(caps) = RE_TITLE.captures(html) else {
        return NO_TITLE.to_string();
    };
    let title = RE_WHITESPACE.replace_all(caps[1].trim(), " ").into_owned();
    if title.chars().count() > MAX_TITLE_CHARS {
        let cut: String = title.chars().take(MAX_TITLE_CHARS).collect();
        format!("{cut}...")
    } else {
        title
    }
}
