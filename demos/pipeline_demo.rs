//! Self-contained pipeline walkthrough: crawl a tiny canned site, ingest it,
//! and run a retrieval query, all without the network.
//!
//! Run with `cargo run --example pipeline_demo`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crawlsmith::config::PipelineConfig;
use crawlsmith::crawl::{CrawlEngine, PageCapture};
use crawlsmith::embeddings::{EmbeddingGateway, MockEmbeddingProvider};
use crawlsmith::sitemap::SitemapReader;
use crawlsmith::stores::MemoryStore;
use crawlsmith::tools::PipelineContext;
use crawlsmith::types::RagError;

/// Serves a three-page documentation site from memory.
struct DemoSite {
    pages: HashMap<String, PageCapture>,
}

impl DemoSite {
    fn new() -> Self {
        let root = "https://demo.dev/docs";
        let ownership = "https://demo.dev/docs/ownership";
        let traits_page = "https://demo.dev/docs/traits";

        let pages = vec![
            PageCapture::page(
                root,
                "# Demo Docs\n\nA small documentation site.\n\nSee the chapters on ownership and traits.",
                vec![ownership.to_string(), traits_page.to_string()],
            ),
            PageCapture::page(
                ownership,
                "# Ownership\n\nEvery value has a single owner. Moves transfer ownership; borrows lend access without transferring it.",
                vec![root.to_string()],
            ),
            PageCapture::page(
                traits_page,
                "# Traits\n\nTraits describe shared behavior. Trait objects allow dynamic dispatch over any implementor.",
                vec![root.to_string()],
            ),
        ];

        Self {
            pages: pages
                .into_iter()
                .map(|page| (page.url.clone(), page))
                .collect(),
        }
    }
}

#[async_trait]
impl CrawlEngine for DemoSite {
    async fn fetch(&self, url: &str) -> Result<PageCapture, RagError> {
        match self.pages.get(url) {
            Some(page) => Ok(page.clone()),
            None => Err(RagError::Fetch(format!("no route to {url}"))),
        }
    }
}

struct NoSitemap;

#[async_trait]
impl SitemapReader for NoSitemap {
    async fn page_urls(&self, _sitemap_url: &str) -> Vec<String> {
        Vec::new()
    }
}

#[tokio::main]
async fn main() -> Result<(), RagError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let ctx = PipelineContext::new(
        Arc::new(DemoSite::new()),
        Arc::new(NoSitemap),
        Arc::new(MemoryStore::new()),
        EmbeddingGateway::new(Arc::new(MockEmbeddingProvider::new())),
        PipelineConfig::default(),
    );

    let crawl = ctx
        .smart_crawl_url("https://demo.dev/docs", None, None, None)
        .await;
    println!(
        "crawl: type={} pages={} chunks={}",
        crawl.crawl_type.unwrap_or("?"),
        crawl.pages_crawled.unwrap_or(0),
        crawl.chunks_stored.unwrap_or(0)
    );

    let sources = ctx.get_available_sources().await;
    println!("sources: {:?}", sources.sources);

    let query = ctx
        .perform_rag_query("How does ownership work?", Some("demo.dev"), Some(3))
        .await;
    println!("query: {} result(s)", query.count);
    for result in &query.results {
        println!(
            "  {:.3}  {}  {}",
            result.similarity,
            result.url,
            result.content.lines().next().unwrap_or("")
        );
    }

    Ok(())
}
