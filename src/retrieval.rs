//! Query-side retrieval: embed the query, rank stored chunks by similarity.

use std::sync::Arc;

use crate::embeddings::EmbeddingGateway;
use crate::stores::{SearchResult, VectorStore};
use crate::types::RagError;

/// Embeds queries and runs similarity searches against a [`VectorStore`].
#[derive(Clone)]
pub struct RetrievalEngine {
    store: Arc<dyn VectorStore>,
    gateway: EmbeddingGateway,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn VectorStore>, gateway: EmbeddingGateway) -> Self {
        Self { store, gateway }
    }

    /// Returns the `match_count` stored chunks most similar to `query`,
    /// descending by similarity; empty when nothing matches.
    ///
    /// `filter_metadata` restricts results to chunks whose metadata contains
    /// every filter key with an equal value.
    pub async fn search(
        &self,
        query: &str,
        match_count: usize,
        filter_metadata: Option<&serde_json::Value>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let query_embedding = self.gateway.embed(query).await;
        self.store
            .similarity_search(&query_embedding, match_count, filter_metadata)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::stores::{ChunkRecord, MemoryStore};
    use serde_json::json;

    async fn seeded_engine() -> RetrievalEngine {
        let gateway = EmbeddingGateway::new(Arc::new(MockEmbeddingProvider::new()));
        let store = Arc::new(MemoryStore::new());

        let texts = [
            ("https://example.com/rust", "Rust ownership and borrowing", "example.com"),
            ("https://example.com/py", "Python list comprehensions", "example.com"),
            ("https://other.com/go", "Go channels and goroutines", "other.com"),
        ];
        let mut chunks = Vec::new();
        for (i, (url, content, source)) in texts.iter().enumerate() {
            chunks.push(
                ChunkRecord::new(*url, 0, *content)
                    .with_metadata(json!({"source": source, "chunk_index": i}))
                    .with_embedding(gateway.embed(content).await),
            );
        }
        store.insert_chunks(chunks).await.unwrap();

        RetrievalEngine::new(store, gateway)
    }

    #[tokio::test]
    async fn exact_content_match_ranks_first() {
        let engine = seeded_engine().await;

        let results = engine
            .search("Rust ownership and borrowing", 3, None)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].url, "https://example.com/rust");
        assert!(results.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }

    #[tokio::test]
    async fn source_filter_limits_results() {
        let engine = seeded_engine().await;
        let filter = json!({"source": "example.com"});

        let results = engine
            .search("anything", 10, Some(&filter))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.metadata["source"] == "example.com"));
    }

    #[tokio::test]
    async fn empty_store_returns_empty_not_error() {
        let gateway = EmbeddingGateway::new(Arc::new(MockEmbeddingProvider::new()));
        let engine = RetrievalEngine::new(Arc::new(MemoryStore::new()), gateway);

        let results = engine.search("query", 5, None).await.unwrap();
        assert!(results.is_empty());
    }
}
