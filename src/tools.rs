//! Tool-facing pipeline operations.
//!
//! [`PipelineContext`] is the explicit context object the request-dispatch
//! layer holds: live handles to the crawl engine, sitemap reader, store, and
//! embedding gateway, constructed once at startup and passed by reference
//! into every operation. Operations never raise; each returns a structured
//! report with a `success` flag and a human-readable error on failure.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::chunker::{extract_section_info, smart_chunk_markdown};
use crate::config::PipelineConfig;
use crate::crawl::{CrawlEngine, CrawlOrchestrator, HttpCrawlEngine, PageCapture};
use crate::embeddings::{
    EmbeddingGateway, EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingProvider,
};
use crate::ingest::{list_sources, upsert_documents};
use crate::retrieval::RetrievalEngine;
use crate::sitemap::{HttpSitemapReader, SitemapReader};
use crate::stores::{MemoryStore, SearchResult, SqliteChunkStore, VectorStore};
use crate::types::RagError;

/// How many crawled URLs a smart-crawl report lists before truncating.
const REPORTED_URL_SAMPLE: usize = 5;

/// Result of crawling and ingesting a single page.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlPageReport {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_stored: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CrawlPageReport {
    fn failure(url: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.to_string(),
            chunks_stored: None,
            content_length: None,
            links_count: None,
            error: Some(error.into()),
        }
    }
}

/// Result of a classify-and-crawl ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct SmartCrawlReport {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_crawled: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_stored: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls_crawled: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SmartCrawlReport {
    fn failure(url: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: url.to_string(),
            crawl_type: None,
            pages_crawled: None,
            chunks_stored: None,
            urls_crawled: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Distinct sources currently indexed.
#[derive(Debug, Clone, Serialize)]
pub struct SourcesReport {
    pub success: bool,
    pub sources: Vec<String>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ranked results for one retrieval query.
#[derive(Debug, Clone, Serialize)]
pub struct RagQueryReport {
    pub success: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filter: Option<String>,
    pub results: Vec<SearchResult>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Live collaborator handles for the whole pipeline.
pub struct PipelineContext {
    orchestrator: CrawlOrchestrator,
    store: Arc<dyn VectorStore>,
    gateway: EmbeddingGateway,
    retrieval: RetrievalEngine,
    config: PipelineConfig,
}

impl PipelineContext {
    pub fn new(
        engine: Arc<dyn CrawlEngine>,
        sitemap: Arc<dyn SitemapReader>,
        store: Arc<dyn VectorStore>,
        gateway: EmbeddingGateway,
        config: PipelineConfig,
    ) -> Self {
        let retrieval = RetrievalEngine::new(Arc::clone(&store), gateway.clone());
        Self {
            orchestrator: CrawlOrchestrator::new(engine, sitemap),
            store,
            gateway,
            retrieval,
            config,
        }
    }

    /// Builds a context from environment configuration: HTTP crawl engine and
    /// sitemap reader, sqlite store when `CHUNKS_DB` is set (memory store
    /// otherwise), and the OpenAI-compatible provider when an API key is
    /// present (deterministic mock otherwise).
    pub async fn from_env() -> Result<Self, RagError> {
        let config = PipelineConfig::from_env();

        let provider: Arc<dyn EmbeddingProvider> = match &config.openai_api_key {
            Some(key) => Arc::new(OpenAiEmbeddingProvider::new(
                key,
                &config.openai_base_url,
                config.embedding_model.clone(),
                config.embedding_dimensions,
            )?),
            None => Arc::new(
                MockEmbeddingProvider::new().with_dimensions(config.embedding_dimensions),
            ),
        };

        let store: Arc<dyn VectorStore> = match &config.chunks_db {
            Some(path) => Arc::new(SqliteChunkStore::open(path).await?),
            None => Arc::new(MemoryStore::new()),
        };

        Ok(Self::new(
            Arc::new(HttpCrawlEngine::new()?),
            Arc::new(HttpSitemapReader::new()?),
            store,
            EmbeddingGateway::new(provider),
            config,
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Crawls one URL, chunks it, and stores its embeddings.
    pub async fn crawl_single_page(&self, url: &str) -> CrawlPageReport {
        let capture = self.orchestrator.crawl_single(url).await;
        if !capture.success {
            let error = capture.error.unwrap_or_else(|| "crawl failed".to_string());
            return CrawlPageReport::failure(url, error);
        }
        if capture.markdown.trim().is_empty() {
            return CrawlPageReport::failure(url, "no content extracted");
        }

        let content_length = capture.markdown.len();
        let links_count = capture.internal_links.len();

        match self
            .ingest_captures(std::slice::from_ref(&capture), self.config.chunk_size)
            .await
        {
            Ok(chunks_stored) => CrawlPageReport {
                success: true,
                url: url.to_string(),
                chunks_stored: Some(chunks_stored),
                content_length: Some(content_length),
                links_count: Some(links_count),
                error: None,
            },
            Err(err) => CrawlPageReport::failure(url, err.to_string()),
        }
    }

    /// Classifies the URL, crawls accordingly, and ingests everything found.
    ///
    /// The optional parameters override the configured crawl depth,
    /// concurrency bound, and chunk size for this call only.
    pub async fn smart_crawl_url(
        &self,
        url: &str,
        max_depth: Option<usize>,
        max_concurrency: Option<usize>,
        chunk_size: Option<usize>,
    ) -> SmartCrawlReport {
        let max_depth = max_depth.unwrap_or(self.config.max_depth);
        let max_concurrency = max_concurrency.unwrap_or(self.config.max_concurrency);
        let chunk_size = chunk_size.unwrap_or(self.config.chunk_size);

        let outcome = match self
            .orchestrator
            .smart_crawl(url, max_depth, max_concurrency)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => return SmartCrawlReport::failure(url, err.to_string()),
        };

        let crawled_urls: Vec<String> = outcome
            .captures
            .iter()
            .filter(|capture| capture.success && !capture.markdown.trim().is_empty())
            .map(|capture| capture.url.clone())
            .collect();
        if crawled_urls.is_empty() {
            return SmartCrawlReport::failure(url, "no content found");
        }

        match self.ingest_captures(&outcome.captures, chunk_size).await {
            Ok(chunks_stored) => SmartCrawlReport {
                success: true,
                url: url.to_string(),
                crawl_type: Some(outcome.kind.label()),
                pages_crawled: Some(crawled_urls.len()),
                chunks_stored: Some(chunks_stored),
                urls_crawled: crawled_urls
                    .into_iter()
                    .take(REPORTED_URL_SAMPLE)
                    .collect(),
                error: None,
            },
            Err(err) => SmartCrawlReport::failure(url, err.to_string()),
        }
    }

    /// Lists every distinct source currently indexed.
    pub async fn get_available_sources(&self) -> SourcesReport {
        match list_sources(self.store.as_ref()).await {
            Ok(sources) => SourcesReport {
                success: true,
                count: sources.len(),
                sources,
                error: None,
            },
            Err(err) => SourcesReport {
                success: false,
                sources: Vec::new(),
                count: 0,
                error: Some(err.to_string()),
            },
        }
    }

    /// Runs a retrieval query, optionally restricted to one source host.
    pub async fn perform_rag_query(
        &self,
        query: &str,
        source: Option<&str>,
        match_count: Option<usize>,
    ) -> RagQueryReport {
        let filter = source.map(|source| json!({"source": source}));
        let match_count = match_count.unwrap_or(self.config.match_count);

        match self.retrieval.search(query, match_count, filter.as_ref()).await {
            Ok(results) => RagQueryReport {
                success: true,
                query: query.to_string(),
                source_filter: source.map(str::to_string),
                count: results.len(),
                results,
                error: None,
            },
            Err(err) => RagQueryReport {
                success: false,
                query: query.to_string(),
                source_filter: source.map(str::to_string),
                results: Vec::new(),
                count: 0,
                error: Some(err.to_string()),
            },
        }
    }

    /// Chunks successful captures and stores them via the replacement path.
    async fn ingest_captures(
        &self,
        captures: &[PageCapture],
        chunk_size: usize,
    ) -> Result<usize, RagError> {
        let mut urls = Vec::new();
        let mut chunk_numbers = Vec::new();
        let mut contents = Vec::new();
        let mut metadatas = Vec::new();
        let mut full_documents = HashMap::new();

        for capture in captures {
            if !capture.success || capture.markdown.trim().is_empty() {
                continue;
            }
            let source = host_of(&capture.url);
            let crawl_time = chrono::Utc::now().to_rfc3339();
            full_documents.insert(capture.url.clone(), capture.markdown.clone());

            for (chunk_index, chunk) in smart_chunk_markdown(&capture.markdown, chunk_size)
                .into_iter()
                .enumerate()
            {
                let info = extract_section_info(&chunk);
                metadatas.push(json!({
                    "headers": info.headers,
                    "char_count": info.char_count,
                    "word_count": info.word_count,
                    "url": capture.url,
                    "source": source,
                    "chunk_index": chunk_index,
                    "crawl_time": crawl_time,
                }));
                urls.push(capture.url.clone());
                chunk_numbers.push(chunk_index);
                contents.push(chunk);
            }
        }

        upsert_documents(
            self.store.as_ref(),
            &self.gateway,
            &urls,
            &chunk_numbers,
            &contents,
            &metadatas,
            &full_documents,
        )
        .await
    }
}

/// Host component of a URL, empty when absent or unparseable.
fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("https://example.com/page"), "example.com");
        assert_eq!(host_of("not-a-valid-url"), "");
    }
}
