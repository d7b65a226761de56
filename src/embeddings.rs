//! Embedding provider contracts and the fail-soft gateway.
//!
//! Providers are injected behind [`EmbeddingProvider`] so the pipeline can run
//! against fakes in tests. The [`EmbeddingGateway`] wraps a provider with the
//! degrade-to-zero policy: ingestion must never abort because one embedding
//! call failed, so failures are logged and replaced with zero vectors of the
//! provider's dimensionality.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::RagError;

/// Capability interface for embedding backends.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Fixed output dimensionality of this provider.
    fn dimensions(&self) -> usize;

    /// Embeds every input text in one call, preserving input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// Fail-soft front door to an [`EmbeddingProvider`].
#[derive(Clone)]
pub struct EmbeddingGateway {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingGateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Dimensionality of every vector this gateway produces.
    pub fn dimensions(&self) -> usize {
        self.provider.dimensions()
    }

    /// Embeds a single text, degrading to a zero vector on provider failure.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await;
        vectors
            .pop()
            .unwrap_or_else(|| vec![0.0; self.dimensions()])
    }

    /// Embeds a batch in one provider call, preserving input order.
    ///
    /// On provider failure the whole batch is zero-filled rather than
    /// retried per-item; callers that need finer-grained degradation can
    /// split their batches.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if texts.is_empty() {
            return Vec::new();
        }

        match self.provider.embed(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => vectors,
            Ok(vectors) => {
                warn!(
                    expected = texts.len(),
                    received = vectors.len(),
                    "embedding provider returned a short batch; degrading to zero vectors"
                );
                self.zero_batch(texts.len())
            }
            Err(err) => {
                warn!(
                    error = %err,
                    batch = texts.len(),
                    "embedding provider failed; degrading batch to zero vectors"
                );
                self.zero_batch(texts.len())
            }
        }
    }

    fn zero_batch(&self, len: usize) -> Vec<Vec<f32>> {
        vec![vec![0.0; self.dimensions()]; len]
    }
}

/// Deterministic hash-based provider for tests and demos.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 16 }
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions.max(1);
        self
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..self.dimensions)
            .map(|i| {
                let bits = seed.rotate_left((i % 64) as u32 * 8) ^ ((i as u64) << 24);
                (bits as f32) / u32::MAX as f32
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.hash_to_vec(text)).collect())
    }
}

/// Provider backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    /// Builds a provider for the given endpoint and model.
    ///
    /// `base_url` is the API root (e.g. `https://api.openai.com/v1`); the
    /// `/embeddings` path is appended here.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, RagError> {
        if api_key.trim().is_empty() {
            return Err(RagError::Validation("missing embedding API key".into()));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|err| RagError::Validation(format!("invalid API key: {err}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .build()
            .map_err(|err| RagError::Provider(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            dimensions,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::Provider(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Provider(format!(
                "embeddings request failed ({status}): {body}"
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RagError::Provider(err.to_string()))?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(RagError::Provider(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}
