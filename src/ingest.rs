//! Document ingestion: per-URL replacement of embedded chunks.
//!
//! The unit of replacement is one URL: every previously stored chunk for a
//! URL is deleted before its new chunks are inserted, so re-ingestion never
//! leaves stale indices or duplicates behind. Units for different URLs are
//! independent of each other.

use std::collections::HashMap;

use tracing::info;

use crate::embeddings::EmbeddingGateway;
use crate::stores::{ChunkRecord, VectorStore};
use crate::types::RagError;

/// Replaces and stores document chunks as one batch.
///
/// `urls`, `chunk_numbers`, `contents`, and `metadatas` are parallel columns,
/// one row per chunk. Embeddings are computed with a single batch call
/// through the gateway (zero-filled on provider failure, so ingestion always
/// proceeds). Returns the number of chunks stored.
///
/// `full_documents` maps each URL to its complete markdown; it is reserved
/// for contextual embedding strategies and not consulted yet.
pub async fn upsert_documents(
    store: &dyn VectorStore,
    gateway: &EmbeddingGateway,
    urls: &[String],
    chunk_numbers: &[usize],
    contents: &[String],
    metadatas: &[serde_json::Value],
    _full_documents: &HashMap<String, String>,
) -> Result<usize, RagError> {
    let rows = urls.len();
    if chunk_numbers.len() != rows || contents.len() != rows || metadatas.len() != rows {
        return Err(RagError::Validation(format!(
            "mismatched ingestion columns: {} urls, {} chunk numbers, {} contents, {} metadatas",
            rows,
            chunk_numbers.len(),
            contents.len(),
            metadatas.len()
        )));
    }
    if rows == 0 {
        return Ok(0);
    }
    if let Some(pos) = contents.iter().position(|content| content.trim().is_empty()) {
        return Err(RagError::Validation(format!(
            "chunk content at row {pos} is empty"
        )));
    }

    let mut distinct_urls: Vec<String> = Vec::new();
    for url in urls {
        if !distinct_urls.contains(url) {
            distinct_urls.push(url.clone());
        }
    }
    store.delete_by_urls(&distinct_urls).await?;

    let embeddings = gateway.embed_batch(contents).await;

    let mut records = Vec::with_capacity(rows);
    for (((url, chunk_index), content), (metadata, embedding)) in urls
        .iter()
        .zip(chunk_numbers)
        .zip(contents)
        .zip(metadatas.iter().zip(embeddings))
    {
        records.push(
            ChunkRecord::new(url.clone(), *chunk_index, content.clone())
                .with_metadata(metadata.clone())
                .with_embedding(embedding),
        );
    }

    store.insert_chunks(records).await?;
    info!(
        chunks = rows,
        urls = distinct_urls.len(),
        "stored document chunks"
    );
    Ok(rows)
}

/// Distinct `metadata.source` values across all stored chunks.
pub async fn list_sources(store: &dyn VectorStore) -> Result<Vec<String>, RagError> {
    store.distinct_sources().await
}
