//! Sitemap expansion into crawlable URL lists.
//!
//! The reader is deliberately forgiving: a non-200 response, unreadable body,
//! or XML without `<loc>` entries all yield an empty list rather than an
//! error, matching the collaborator contract. Extraction scans for `<loc>`
//! elements directly instead of fully parsing the XML.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use crate::types::RagError;

static LOC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<loc>\s*([^<]+?)\s*</loc>").expect("loc pattern is valid"));

/// Capability interface for turning a sitemap URL into page URLs.
#[async_trait]
pub trait SitemapReader: Send + Sync {
    /// Lists the page URLs a sitemap points at; empty when unavailable.
    async fn page_urls(&self, sitemap_url: &str) -> Vec<String>;
}

/// Pulls every `<loc>` entry out of sitemap XML, in document order.
pub fn extract_loc_urls(xml: &str) -> Vec<String> {
    let mut urls = Vec::new();
    for captures in LOC_PATTERN.captures_iter(xml) {
        if let Some(loc) = captures.get(1) {
            let url = loc.as_str().trim().to_string();
            if !url.is_empty() && !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

/// [`SitemapReader`] that fetches sitemaps over HTTP.
pub struct HttpSitemapReader {
    client: reqwest::Client,
}

impl HttpSitemapReader {
    pub fn new() -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|err| RagError::Sitemap(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SitemapReader for HttpSitemapReader {
    async fn page_urls(&self, sitemap_url: &str) -> Vec<String> {
        let response = match self.client.get(sitemap_url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = sitemap_url, error = %err, "sitemap fetch failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(
                url = sitemap_url,
                status = %response.status(),
                "sitemap fetch returned non-success status"
            );
            return Vec::new();
        }

        match response.text().await {
            Ok(body) => extract_loc_urls(&body),
            Err(err) => {
                warn!(url = sitemap_url, error = %err, "sitemap body unreadable");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_loc_entries_in_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
            <url><loc>https://example.com/page1</loc></url>
            <url><loc> https://example.com/page2 </loc></url>
        </urlset>"#;

        let urls = extract_loc_urls(xml);

        assert_eq!(
            urls,
            vec![
                "https://example.com/page1".to_string(),
                "https://example.com/page2".to_string(),
            ]
        );
    }

    #[test]
    fn malformed_xml_yields_nothing() {
        assert!(extract_loc_urls("Invalid XML content").is_empty());
        assert!(extract_loc_urls("").is_empty());
    }

    #[test]
    fn duplicate_locs_collapse() {
        let xml = "<loc>https://example.com/a</loc><loc>https://example.com/a</loc>";
        assert_eq!(extract_loc_urls(xml).len(), 1);
    }
}
