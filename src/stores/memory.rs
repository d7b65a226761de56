//! In-memory store using brute-force cosine similarity.
//!
//! Keeps everything in a `RwLock`'d vector; suitable for tests, demos, and
//! small corpora, not for persistence.

use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ChunkRecord, SearchResult, VectorStore, metadata_matches};
use crate::types::RagError;

#[derive(Default)]
pub struct MemoryStore {
    chunks: RwLock<Vec<ChunkRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn insert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), RagError> {
        self.chunks.write().extend(chunks);
        Ok(())
    }

    async fn delete_by_urls(&self, urls: &[String]) -> Result<usize, RagError> {
        let mut guard = self.chunks.write();
        let before = guard.len();
        guard.retain(|chunk| !urls.contains(&chunk.url));
        Ok(before - guard.len())
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        match_count: usize,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let guard = self.chunks.read();

        let mut scored: Vec<SearchResult> = guard
            .iter()
            .filter(|chunk| {
                filter.is_none_or(|filter| metadata_matches(&chunk.metadata, filter))
            })
            .map(|chunk| SearchResult {
                url: chunk.url.clone(),
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                similarity: Self::cosine_similarity(&chunk.embedding, query_embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(match_count);
        Ok(scored)
    }

    async fn distinct_sources(&self) -> Result<Vec<String>, RagError> {
        let guard = self.chunks.read();
        let sources: BTreeSet<String> = guard
            .iter()
            .filter_map(|chunk| chunk.metadata.get("source"))
            .filter_map(|value| value.as_str())
            .map(str::to_string)
            .collect();
        Ok(sources.into_iter().collect())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.chunks.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(url: &str, index: usize, source: &str, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord::new(url, index, format!("content {index} of {url}"))
            .with_metadata(json!({"source": source, "chunk_index": index}))
            .with_embedding(embedding)
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let store = MemoryStore::new();
        store
            .insert_chunks(vec![
                record("https://a.com/1", 0, "a.com", vec![1.0, 0.0]),
                record("https://a.com/2", 0, "a.com", vec![0.0, 1.0]),
                record("https://a.com/3", 0, "a.com", vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store
            .similarity_search(&[1.0, 0.0], 2, None)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://a.com/1");
        assert!(results[0].similarity >= results[1].similarity);
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.similarity)));
    }

    #[tokio::test]
    async fn filter_restricts_results_to_matching_metadata() {
        let store = MemoryStore::new();
        store
            .insert_chunks(vec![
                record("https://a.com/1", 0, "example.com", vec![1.0, 0.0]),
                record("https://b.com/1", 0, "other.com", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let filter = json!({"source": "example.com"});
        let results = store
            .similarity_search(&[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata["source"], "example.com");
    }

    #[tokio::test]
    async fn delete_by_urls_removes_only_named_urls() {
        let store = MemoryStore::new();
        store
            .insert_chunks(vec![
                record("https://a.com/1", 0, "a.com", vec![1.0]),
                record("https://a.com/1", 1, "a.com", vec![1.0]),
                record("https://b.com/1", 0, "b.com", vec![1.0]),
            ])
            .await
            .unwrap();

        let deleted = store
            .delete_by_urls(&["https://a.com/1".to_string()])
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn distinct_sources_deduplicates() {
        let store = MemoryStore::new();
        store
            .insert_chunks(vec![
                record("https://a.com/1", 0, "example.com", vec![1.0]),
                record("https://a.com/2", 0, "example.com", vec![1.0]),
                record("https://b.com/1", 0, "test.com", vec![1.0]),
            ])
            .await
            .unwrap();

        let sources = store.distinct_sources().await.unwrap();
        assert_eq!(
            sources,
            vec!["example.com".to_string(), "test.com".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_store_searches_to_empty_results() {
        let store = MemoryStore::new();
        let results = store.similarity_search(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(results.is_empty());
    }
}
