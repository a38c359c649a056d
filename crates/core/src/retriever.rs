use crate::embeddings::Embedder;
use crate::error::RetrieveError;
use crate::index::{DiskIndex, VectorIndex};
use crate::models::RetrievedChunk;
use std::path::Path;
use tracing::debug;

/// Result count used when the caller does not ask for a specific k.
pub const DEFAULT_TOP_K: usize = 3;

/// Read-only query interface over the persisted index.
///
/// The embedder must match the configuration the index was built with;
/// `open` enforces the dimension part of that and the rest is the caller's
/// responsibility.
pub struct Retriever {
    index: DiskIndex,
    embedder: Box<dyn Embedder>,
}

impl Retriever {
    /// Open the index under `index_dir`. The missing-index check happens
    /// here, before any embedding work is attempted.
    pub fn open(index_dir: &Path, embedder: Box<dyn Embedder>) -> Result<Self, RetrieveError> {
        let index = DiskIndex::open(index_dir)?;

        let index_dimensions = index.meta().embedding.dimensions;
        if index_dimensions != embedder.dimensions() {
            return Err(RetrieveError::DimensionMismatch {
                embedder: embedder.dimensions(),
                index: index_dimensions,
            });
        }

        Ok(Self { index, embedder })
    }

    /// Embed `query` and return up to `k` stored chunks ordered by
    /// non-increasing similarity. An empty index yields an empty result,
    /// not an error.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, RetrieveError> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query)?;
        let hits = self.index.search(&query_vector, k);
        debug!(query, k, hits = hits.len(), "retrieval complete");
        Ok(hits)
    }
}
