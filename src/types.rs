//! Crate-wide error taxonomy.
//!
//! Fetch and provider failures are usually absorbed at the component boundary
//! (a failed page becomes a [`crate::crawl::PageCapture`] with `success =
//! false`, a failed embedding call becomes a zero vector). The variants here
//! are what escapes to callers: storage and validation problems abort the
//! surrounding operation, everything else is carried per-item.

use thiserror::Error;

/// Errors surfaced by the ingestion and retrieval pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// The crawl engine failed to fetch a URL.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The embedding provider rejected or failed a request.
    #[error("embedding provider failure: {0}")]
    Provider(String),

    /// A vector store operation failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Malformed caller input, such as an unparseable URL or mismatched
    /// ingestion columns.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The sitemap collaborator could not produce a URL list.
    #[error("sitemap error: {0}")]
    Sitemap(String),

    /// Filesystem or other I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Fetch(err.to_string())
    }
}
