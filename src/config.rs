//! Environment-driven pipeline configuration.

use std::env;
use std::path::PathBuf;

/// Tunables for crawling, chunking, embedding, and retrieval.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target chunk size in bytes.
    pub chunk_size: usize,
    /// Maximum depth for recursive crawls (depth 0 is the start set).
    pub max_depth: usize,
    /// Concurrency bound for batch and per-depth fetches.
    pub max_concurrency: usize,
    /// Default number of results per retrieval query.
    pub match_count: usize,
    /// Embedding model name for the OpenAI-compatible provider.
    pub embedding_model: String,
    /// Embedding dimensionality; constant across the store.
    pub embedding_dimensions: usize,
    /// API key for the embedding provider, if configured.
    pub openai_api_key: Option<String>,
    /// API root of the embedding provider.
    pub openai_base_url: String,
    /// Path for the sqlite chunk database; in-memory store when unset.
    pub chunks_db: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5000,
            max_depth: 3,
            max_concurrency: 10,
            match_count: 5,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            chunks_db: None,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from the environment (and `.env`, if present).
    ///
    /// Absent or unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            chunk_size: env_usize("CHUNK_SIZE", defaults.chunk_size),
            max_depth: env_usize("MAX_CRAWL_DEPTH", defaults.max_depth),
            max_concurrency: env_usize("MAX_CONCURRENT_CRAWLS", defaults.max_concurrency),
            match_count: env_usize("MATCH_COUNT", defaults.match_count),
            embedding_model: env::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimensions: env_usize("EMBEDDING_DIMENSIONS", defaults.embedding_dimensions),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty()),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            chunks_db: env::var("CHUNKS_DB").ok().map(PathBuf::from),
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
