//! In-memory vector store with JSON snapshot persistence.
//!
//! Stores `{id, text, metadata, embedding}` tuples behind a
//! `std::sync::RwLock`. Search is brute-force cosine similarity over
//! all stored embeddings. The durable state is a single JSON file
//! holding the full collection, rewritten after every mutating call
//! (batch inserts persist once at the end, not per item).
//!
//! Concurrency follows a single-writer discipline: mutations serialize
//! on the write lock and persist before releasing it, so the snapshot
//! file is always written in mutation order; readers observe either the
//! pre- or post-mutation collection, never a torn state. Persistence
//! failures are logged and
//! the in-memory state is kept, so a broken disk never fails a request.
//!
//! Duplicate ids: inserting a document whose id is already present
//! replaces the existing entry (last write wins).

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::warn;

use crate::embedding::cosine_similarity;
use crate::models::Document;

/// A document together with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

/// Result of one vector search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Qualifying documents, best first, truncated to `max_results`.
    pub hits: Vec<SearchHit>,
    /// Count of all documents meeting `min_similarity`, which may
    /// exceed the number of hits returned.
    pub total_candidates: usize,
    /// Wall-clock search time.
    pub elapsed: Duration,
}

/// Collection size and readiness snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreStats {
    pub count: usize,
    pub is_ready: bool,
}

/// In-memory vector store with optional durable snapshot.
pub struct VectorStore {
    entries: RwLock<Vec<Document>>,
    path: Option<PathBuf>,
}

impl VectorStore {
    /// Create a memory-only store.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            path: None,
        }
    }

    /// Open a store backed by a snapshot file.
    ///
    /// A missing snapshot yields an empty store. A corrupt snapshot is
    /// logged and treated as empty; the next successful mutation
    /// rewrites it.
    pub fn open(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<Document>>(&content) {
                Ok(docs) => docs,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt vector store snapshot, starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            entries: RwLock::new(entries),
            path: Some(path),
        }
    }

    /// Insert a single document, persisting the full collection.
    pub async fn add(&self, doc: Document) -> Result<()> {
        self.add_batch(vec![doc]).await
    }

    /// Insert a batch of documents, persisting once at the end.
    ///
    /// All embeddings in the batch must share the dimensionality of the
    /// existing collection. Documents with an id already present
    /// replace the stored entry.
    pub async fn add_batch(&self, docs: Vec<Document>) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries.write().unwrap();

        let expected_dims = entries
            .first()
            .map(|d| d.embedding.len())
            .or_else(|| docs.first().map(|d| d.embedding.len()))
            .unwrap_or(0);

        for doc in &docs {
            if doc.embedding.is_empty() {
                bail!("document '{}' has an empty embedding", doc.id);
            }
            if doc.embedding.len() != expected_dims {
                bail!(
                    "document '{}' has embedding dimension {} but the store holds {}-dimensional vectors",
                    doc.id,
                    doc.embedding.len(),
                    expected_dims
                );
            }
        }

        for doc in docs {
            entries.retain(|existing| existing.id != doc.id);
            entries.push(doc);
        }

        // Persist while still holding the write guard, so concurrent
        // mutations cannot write their snapshots out of order.
        self.persist(&entries);
        Ok(())
    }

    /// Cosine-similarity top-K search with a minimum-similarity cutoff.
    ///
    /// An empty store returns an empty outcome with
    /// `total_candidates = 0`, never an error.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        max_results: usize,
        min_similarity: f32,
    ) -> SearchOutcome {
        let started = Instant::now();

        let mut hits: Vec<SearchHit> = {
            let entries = self.entries.read().unwrap();
            entries
                .iter()
                .filter_map(|doc| {
                    let score = cosine_similarity(query_embedding, &doc.embedding);
                    if score >= min_similarity {
                        Some(SearchHit {
                            document: doc.clone(),
                            score,
                        })
                    } else {
                        None
                    }
                })
                .collect()
        };

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total_candidates = hits.len();
        hits.truncate(max_results);

        SearchOutcome {
            hits,
            total_candidates,
            elapsed: started.elapsed(),
        }
    }

    /// Empty the collection and remove the durable snapshot.
    pub async fn clear(&self) -> Result<()> {
        // The file removal stays under the write guard for the same
        // ordering reason as `add_batch`'s persist.
        let mut entries = self.entries.write().unwrap();
        entries.clear();

        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove vector store snapshot");
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        let entries = self.entries.read().unwrap();
        StoreStats {
            count: entries.len(),
            is_ready: true,
        }
    }

    /// Full-file rewrite of the snapshot. Failures are logged; the
    /// in-memory collection stays authoritative.
    fn persist(&self, entries: &[Document]) {
        let Some(path) = &self.path else {
            return;
        };

        let result = serde_json::to_vec_pretty(entries)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| std::fs::write(path, bytes).map_err(anyhow::Error::from));

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "failed to persist vector store snapshot");
        }
    }
}
