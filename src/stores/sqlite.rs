//! SQLite-backed store with vector search via `sqlite-vec`.
//!
//! Embeddings are stored as JSON float arrays and compared with
//! `vec_distance_cosine(vec_f32(...), vec_f32(...))`, so no auxiliary index
//! table is needed; searches are linear scans ordered by distance, which is
//! plenty for the corpus sizes a single crawl produces.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::Once;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, ffi};

use super::{ChunkRecord, SearchResult, VectorStore, metadata_matches};
use crate::types::RagError;

#[derive(Clone)]
pub struct SqliteChunkStore {
    conn: Connection,
}

impl SqliteChunkStore {
    /// Opens (or creates) a chunk database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        Self::register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        conn.call(|conn| {
            // Confirm the vec extension actually loaded before going further.
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                .map_err(tokio_rusqlite::Error::Rusqlite)?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS chunks (
                     id TEXT PRIMARY KEY,
                     url TEXT NOT NULL,
                     chunk_index INTEGER NOT NULL,
                     content TEXT NOT NULL,
                     metadata TEXT NOT NULL,
                     embedding TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS chunks_url_idx ON chunks(url);",
            )
            .map_err(tokio_rusqlite::Error::Rusqlite)?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        Ok(Self { conn })
    }

    fn register_sqlite_vec() -> Result<(), RagError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(RagError::Storage)
    }
}

#[async_trait]
impl VectorStore for SqliteChunkStore {
    async fn insert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut rows = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let metadata = chunk.metadata.to_string();
            let embedding = serde_json::to_string(&chunk.embedding)
                .map_err(|err| RagError::Storage(err.to_string()))?;
            rows.push((chunk.id, chunk.url, chunk.chunk_index as i64, chunk.content, metadata, embedding));
        }

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(tokio_rusqlite::Error::Rusqlite)?;
                {
                    let mut stmt = tx
                        .prepare(
                            "INSERT OR REPLACE INTO chunks \
                             (id, url, chunk_index, content, metadata, embedding) \
                             VALUES (?, ?, ?, ?, ?, ?)",
                        )
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    for row in &rows {
                        stmt.execute((&row.0, &row.1, row.2, &row.3, &row.4, &row.5))
                            .map_err(tokio_rusqlite::Error::Rusqlite)?;
                    }
                }
                tx.commit().map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn delete_by_urls(&self, urls: &[String]) -> Result<usize, RagError> {
        if urls.is_empty() {
            return Ok(0);
        }
        let urls = urls.to_vec();

        self.conn
            .call(move |conn| {
                let mut deleted = 0usize;
                for url in &urls {
                    deleted += conn
                        .execute("DELETE FROM chunks WHERE url = ?", [url])
                        .map_err(tokio_rusqlite::Error::Rusqlite)?;
                }
                Ok(deleted)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        match_count: usize,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<SearchResult>, RagError> {
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| RagError::Storage(err.to_string()))?;

        // With a metadata filter the limit moves to the Rust side, since the
        // subset test runs after the scan.
        let limit: i64 = if filter.is_some() { -1 } else { match_count as i64 };

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT url, content, metadata, \
                         vec_distance_cosine(vec_f32(embedding), vec_f32(?)) AS distance \
                         FROM chunks \
                         ORDER BY distance ASC \
                         LIMIT {limit}"
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mapped = stmt
                    .query_map([&embedding_json], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, f32>(3)?,
                        ))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut rows = Vec::new();
                for row in mapped {
                    rows.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(rows)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        let mut results = Vec::new();
        for (url, content, metadata, distance) in rows {
            let metadata: serde_json::Value =
                serde_json::from_str(&metadata).unwrap_or_default();
            if let Some(filter) = filter {
                if !metadata_matches(&metadata, filter) {
                    continue;
                }
            }
            results.push(SearchResult {
                url,
                content,
                metadata,
                similarity: (1.0 - distance).clamp(0.0, 1.0),
            });
            if results.len() == match_count {
                break;
            }
        }
        Ok(results)
    }

    async fn distinct_sources(&self) -> Result<Vec<String>, RagError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT DISTINCT json_extract(metadata, '$.source') AS source \
                         FROM chunks \
                         WHERE json_extract(metadata, '$.source') IS NOT NULL \
                         ORDER BY source",
                    )
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mapped = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut sources = Vec::new();
                for source in mapped {
                    sources.push(source.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(sources)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }
}
