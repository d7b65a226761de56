//! Crawl orchestration: single, batch, recursive, and policy-driven crawls.
//!
//! Actual fetching and rendering is delegated to a [`CrawlEngine`]
//! collaborator; the orchestrator owns traversal policy only. Recursive
//! crawls are breadth-first over an explicit visited set and frontier,
//! processed in depth-synchronized batches so memory stays bounded and
//! cyclic link graphs terminate.

pub mod http;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use crate::classify::{UrlKind, classify};
use crate::sitemap::SitemapReader;
use crate::types::RagError;

pub use http::HttpCrawlEngine;

/// One fetched page, successful or not.
///
/// Immutable once produced; batch and recursive crawls keep failed captures
/// (with `error` populated) so callers can report partial failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCapture {
    pub url: String,
    pub markdown: String,
    pub internal_links: Vec<String>,
    pub success: bool,
    pub error: Option<String>,
}

impl PageCapture {
    pub fn page(
        url: impl Into<String>,
        markdown: impl Into<String>,
        internal_links: Vec<String>,
    ) -> Self {
        Self {
            url: url.into(),
            markdown: markdown.into(),
            internal_links,
            success: true,
            error: None,
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            markdown: String::new(),
            internal_links: Vec::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Capability interface for the external crawl engine.
#[async_trait]
pub trait CrawlEngine: Send + Sync {
    /// Fetches a single URL.
    async fn fetch(&self, url: &str) -> Result<PageCapture, RagError>;

    /// Fetches many URLs with bounded parallelism.
    ///
    /// Returns exactly one capture per input URL; engine errors become
    /// failed captures. Result order is unspecified.
    async fn fetch_many(&self, urls: &[String], max_concurrency: usize) -> Vec<PageCapture> {
        let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
        let fetches = urls.iter().map(|url| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                // The semaphore is never closed, so acquisition cannot fail.
                let _permit = semaphore.acquire().await.ok();
                match self.fetch(url).await {
                    Ok(capture) => capture,
                    Err(err) => PageCapture::failure(url.clone(), err.to_string()),
                }
            }
        });
        join_all(fetches).await
    }
}

/// Outcome of a policy-driven [`CrawlOrchestrator::smart_crawl`].
#[derive(Debug, Clone)]
pub struct SmartCrawlOutcome {
    pub kind: UrlKind,
    pub captures: Vec<PageCapture>,
}

/// Coordinates fetches through an injected [`CrawlEngine`].
#[derive(Clone)]
pub struct CrawlOrchestrator {
    engine: Arc<dyn CrawlEngine>,
    sitemap: Arc<dyn SitemapReader>,
}

impl CrawlOrchestrator {
    pub fn new(engine: Arc<dyn CrawlEngine>, sitemap: Arc<dyn SitemapReader>) -> Self {
        Self { engine, sitemap }
    }

    /// Fetches one URL; engine failures become failed captures, never errors.
    pub async fn crawl_single(&self, url: &str) -> PageCapture {
        match self.engine.fetch(url).await {
            Ok(capture) => capture,
            Err(err) => PageCapture::failure(url, err.to_string()),
        }
    }

    /// Fetches all URLs with bounded parallelism, keeping failed captures.
    pub async fn crawl_batch(&self, urls: &[String], max_concurrency: usize) -> Vec<PageCapture> {
        self.engine.fetch_many(urls, max_concurrency).await
    }

    /// Breadth-first crawl following same-site internal links.
    ///
    /// The visited set is seeded with the (normalized) start URLs; each depth
    /// fetches the whole frontier before any link is collected, so no URL is
    /// fetched twice even on cyclic graphs. Depth 0 is the start set itself.
    pub async fn crawl_recursive(
        &self,
        start_urls: &[String],
        max_depth: usize,
        max_concurrency: usize,
    ) -> Vec<PageCapture> {
        let mut visited = HashSet::new();
        let mut frontier = Vec::new();
        for url in start_urls {
            let normalized = normalize_url(url);
            if visited.insert(normalized.clone()) {
                frontier.push(normalized);
            }
        }

        let mut captures = Vec::new();
        for depth in 0..max_depth {
            if frontier.is_empty() {
                break;
            }

            let results = self.engine.fetch_many(&frontier, max_concurrency).await;

            // Depth barrier: the visited set and next frontier are updated
            // only after every fetch at this depth has completed.
            let mut next = Vec::new();
            for capture in &results {
                if !capture.success {
                    continue;
                }
                for link in &capture.internal_links {
                    let normalized = normalize_url(link);
                    if visited.insert(normalized.clone()) {
                        next.push(normalized);
                    }
                }
            }

            debug!(
                depth,
                fetched = results.len(),
                discovered = next.len(),
                "crawl depth complete"
            );
            captures.extend(results);
            frontier = next;
        }

        captures
    }

    /// Classifies the URL and dispatches to the matching crawl strategy.
    ///
    /// Sitemaps expand into a batch crawl of their listed pages, text files
    /// are fetched directly, and ordinary pages are crawled recursively.
    pub async fn smart_crawl(
        &self,
        url: &str,
        max_depth: usize,
        max_concurrency: usize,
    ) -> Result<SmartCrawlOutcome, RagError> {
        let kind = classify(url);
        let captures = match kind {
            UrlKind::Sitemap => {
                let page_urls = self.sitemap.page_urls(url).await;
                if page_urls.is_empty() {
                    return Err(RagError::Sitemap(format!("no URLs found in sitemap: {url}")));
                }
                self.crawl_batch(&page_urls, max_concurrency).await
            }
            UrlKind::TextFile => vec![self.crawl_single(url).await],
            UrlKind::Webpage => {
                self.crawl_recursive(&[url.to_string()], max_depth, max_concurrency)
                    .await
            }
        };

        Ok(SmartCrawlOutcome { kind, captures })
    }
}

/// Normalizes a URL for visited-set identity: parsed form without fragment.
///
/// Unparseable strings are used as-is so traversal stays total.
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.trim().to_string(),
    }
}
