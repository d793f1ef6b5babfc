// src/core/scanner/search_scanner.rs

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use super::{normalize_host, ScanContext, ScanDeps, SourceScanner};
use crate::core::error::FetchError;
use crate::core::models::Source;

/// Scrapes one page of `site:target` search results for in-scope links.
pub struct SearchScanner {
    deps: ScanDeps,
}

impl SearchScanner {
    pub fn new(deps: ScanDeps) -> Self {
        Self { deps }
    }
}

/// Authority of every absolute link on a page.
static RE_LINK_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://([^/\s"'<>?#&]+)"#).unwrap());

/// Distinct in-scope hosts linked from `page`, in order of appearance.
pub fn hosts_in_page(page: &str, target: &str) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    for caps in RE_LINK_HOST.captures_iter(page) {
        let host = normalize_host(&caps[1]);
        if super::is_subdomain_of(&host, target) && !hosts.contains(&host) {
            hosts.push(host);
        }
    }
    hosts
}

#[async_trait]
impl SourceScanner for SearchScanner {
    fn source(&self) -> Source {
        Source::Search
    }

    async fn scan(&self, ctx: &mut ScanContext) -> Result<(), FetchError> {
        let target = ctx.target().to_string();
        info!(target = %target, "Starting search engine scan.");

        let request = self
            .deps
            .http
            .get(&self.deps.config.upstream.search_url)
            .query(&[("q", format!("site:{target}"))])
            .send();
        let Some(response) = ctx.interruptible(request).await else {
            return Ok(());
        };
        let response = response.map_err(|e| {
            warn!(target = %target, error = %e, "Search request failed.");
            FetchError::Request(e)
        })?;
        if !response.status().is_success() {
            warn!(target = %target, status = %response.status(), "Search engine returned an error status.");
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let Some(page) = ctx.interruptible(response.text()).await else {
            return Ok(());
        };
        let page = page?;

        for host in hosts_in_page(&page, &target) {
            if ctx.is_cancelled() {
                return Ok(());
            }
            ctx.emit(host).await?;
        }

        info!(target = %target, found = ctx.found(), "Search engine scan finished.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_links_are_filtered_to_target() {
        let page = r#"
            <a href="https://docs.example.com/start">Docs</a>
            <a href="http://SHOP.example.com">Shop</a>
            <a href="https://docs.example.com/other">Again</a>
            <a href="https://example.com/">Apex</a>
            <a href="https://example.com.evil.org/">Lookalike</a>
            <a href="https://login.example.com.evil.org/phish">Nested lookalike</a>
            <a href="https://user@api.example.com:8443/v1?x=1">Port</a>
            <a href="https://notexample.com/">Other</a>
        "#;
        assert_eq!(
            hosts_in_page(page, "example.com"),
            vec!["docs.example.com", "shop.example.com", "api.example.com"]
        );
    }

    #[test]
    fn target_dots_are_literal() {
        assert!(hosts_in_page("https://a.exampleXcom/", "example.com").is_empty());
    }

    #[test]
    fn lookalike_suffix_is_not_truncated_to_target() {
        let page = r#"<a href="https://login.example.com.evil.org/phish">Sign in</a>"#;
        assert!(hosts_in_page(page, "example.com").is_empty());
    }
}
