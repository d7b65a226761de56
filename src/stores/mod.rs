//! Vector storage backends for embedded chunks.
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorStore trait│
//!                  │   (async CRUD)   │
//!                  └────────┬─────────┘
//!                           │
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!       ┌─────────────┐          ┌──────────────┐
//!       │ MemoryStore │          │ SqliteChunk- │
//!       │ (brute force│          │ Store        │
//!       │  cosine)    │          │ (sqlite-vec) │
//!       └─────────────┘          └──────────────┘
//! ```
//!
//! Every backend guarantees: per-URL replacement is delete-then-insert,
//! similarity results come back in descending order with scores in `[0, 1]`,
//! and metadata filters are exact-match subset tests.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::RagError;

pub use memory::MemoryStore;
pub use sqlite::SqliteChunkStore;

/// A chunk with its embedding, ready for storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier for this chunk.
    pub id: String,
    /// Source URL the chunk came from.
    pub url: String,
    /// Zero-based position of this chunk within its source document.
    pub chunk_index: usize,
    /// The chunk text; never empty or whitespace-only.
    pub content: String,
    /// Chunk metadata (always carries `source`, header and size statistics).
    pub metadata: serde_json::Value,
    /// The embedding vector; length is constant across a store.
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    /// Creates a record with a fresh id and empty metadata/embedding.
    pub fn new(url: impl Into<String>, chunk_index: usize, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            chunk_index,
            content: content.into(),
            metadata: serde_json::Value::Object(Default::default()),
            embedding: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// One ranked hit from a similarity search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub content: String,
    pub metadata: serde_json::Value,
    /// Similarity score in `[0, 1]`, higher is closer.
    pub similarity: f32,
}

/// Unified interface for chunk storage backends.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts chunk records as one batch.
    async fn insert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), RagError>;

    /// Deletes every chunk belonging to any of the given URLs; returns the
    /// number of deleted chunks.
    async fn delete_by_urls(&self, urls: &[String]) -> Result<usize, RagError>;

    /// Returns the `match_count` nearest chunks by vector similarity,
    /// descending, optionally restricted to chunks whose metadata contains
    /// every key/value pair of `filter`.
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        match_count: usize,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<SearchResult>, RagError>;

    /// Distinct non-null `metadata.source` values across all stored chunks.
    async fn distinct_sources(&self) -> Result<Vec<String>, RagError>;

    /// Total number of stored chunks.
    async fn count(&self) -> Result<usize, RagError>;
}

/// Exact-match subset test: every key in `filter` must appear in `metadata`
/// with an equal value.
pub(crate) fn metadata_matches(metadata: &serde_json::Value, filter: &serde_json::Value) -> bool {
    match filter.as_object() {
        Some(entries) => entries
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected)),
        None => metadata == filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_filter_is_a_subset_test() {
        let metadata = json!({"source": "example.com", "chunk_index": 0});

        assert!(metadata_matches(&metadata, &json!({})));
        assert!(metadata_matches(&metadata, &json!({"source": "example.com"})));
        assert!(!metadata_matches(&metadata, &json!({"source": "other.com"})));
        assert!(!metadata_matches(&metadata, &json!({"missing": true})));
    }
}
