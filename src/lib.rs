//! Crawl-and-retrieve RAG pipeline: classify a URL, crawl it the right way,
//! chunk the markdown on structural boundaries, embed the chunks, and serve
//! similarity queries over the result.
//!
//! ```text
//! URL ──► classify ──┬─► Sitemap  ──► sitemap::SitemapReader ──► crawl_batch
//!                    ├─► TextFile ──► crawl_single
//!                    └─► Webpage  ──► crawl_recursive (BFS, visited set)
//!                                         │
//! PageCapture(s) ──► chunker::smart_chunk_markdown ──► chunks + section metadata
//!                                         │
//! chunks ──► embeddings::EmbeddingGateway ──► vectors (zero-filled on failure)
//!                                         │
//! vectors ──► ingest::upsert_documents ──► stores::VectorStore (delete-then-insert)
//!
//! query ──► EmbeddingGateway ──► retrieval::RetrievalEngine ──► ranked SearchResults
//! ```
//!
pub mod chunker;
pub mod classify;
pub mod config;
pub mod crawl;
pub mod embeddings;
pub mod ingest;
pub mod retrieval;
pub mod sitemap;
pub mod stores;
pub mod tools;
pub mod types;

pub use chunker::{extract_section_info, smart_chunk_markdown};
pub use classify::{UrlKind, classify};
pub use config::PipelineConfig;
pub use crawl::{CrawlEngine, CrawlOrchestrator, PageCapture};
pub use embeddings::{EmbeddingGateway, EmbeddingProvider};
pub use retrieval::RetrievalEngine;
pub use stores::{ChunkRecord, SearchResult, VectorStore};
pub use tools::PipelineContext;
pub use types::RagError;
