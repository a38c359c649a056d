use crate::embeddings::{Embedder, EmbeddingConfig};
use crate::error::{IngestError, RetrieveError};
use crate::models::{RebuildMode, RetrievedChunk};
use crate::store::load_chunk_batches;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const INDEX_FILE_NAME: &str = "index.json";

/// Recorded at build time so a query-side embedder can be validated
/// against the space the index was built in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub embedding: EmbeddingConfig,
    pub entry_count: usize,
    pub built_at: DateTime<Utc>,
}

/// One indexed chunk: its embedding plus the original content and
/// metadata, enough to answer a query without touching the artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub content: String,
    pub source: String,
    pub chunk_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    meta: IndexMeta,
    entries: Vec<IndexEntry>,
}

/// Nearest-neighbor search capability. Any store that can rank stored
/// chunks against a query vector satisfies the retriever.
pub trait VectorIndex {
    fn search(&self, query_vector: &[f32], k: usize) -> Vec<RetrievedChunk>;
}

/// The on-disk index: a single JSON file under the index directory, read
/// wholesale into memory and searched by brute-force dot product (entries
/// are normalized at build time, so this is cosine similarity).
pub struct DiskIndex {
    meta: IndexMeta,
    entries: Vec<IndexEntry>,
}

impl DiskIndex {
    pub fn index_file(index_dir: &Path) -> PathBuf {
        index_dir.join(INDEX_FILE_NAME)
    }

    pub fn exists(index_dir: &Path) -> bool {
        Self::index_file(index_dir).is_file()
    }

    /// Load the persisted index. A missing index is reported as
    /// [`RetrieveError::IndexNotFound`] naming the expected location.
    pub fn open(index_dir: &Path) -> Result<Self, RetrieveError> {
        let path = Self::index_file(index_dir);
        if !path.is_file() {
            return Err(RetrieveError::IndexNotFound(path));
        }

        let raw = fs::read_to_string(&path)?;
        let file: IndexFile =
            serde_json::from_str(&raw).map_err(|error| RetrieveError::MalformedIndex {
                path,
                details: error.to_string(),
            })?;

        Ok(Self {
            meta: file.meta,
            entries: file.entries,
        })
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VectorIndex for DiskIndex {
    fn search(&self, query_vector: &[f32], k: usize) -> Vec<RetrievedChunk> {
        let mut hits: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|entry| RetrievedChunk {
                content: entry.content.clone(),
                source: entry.source.clone(),
                chunk_id: entry.chunk_id,
                score: dot(&entry.embedding, query_vector),
            })
            .collect();

        hits.sort_by(|left, right| right.score.total_cmp(&left.score));
        hits.truncate(k);
        hits
    }
}

#[derive(Debug)]
pub struct IndexBuildReport {
    pub entry_count: usize,
    pub source_count: usize,
    pub index_file: PathBuf,
    pub wrote_index: bool,
}

/// Embed every persisted chunk and write the vector index.
///
/// `Replace` discards any prior index; `Append` merges the new entries onto
/// it, refusing if the prior index was built with a different embedding
/// configuration. The index file is written to a staging path and renamed
/// over the live one, so an interrupted build leaves the previous index
/// intact. No chunks at all is a zero-work result and writes nothing.
pub fn build_index(
    processed_dir: &Path,
    index_dir: &Path,
    embedder: &dyn Embedder,
    mode: RebuildMode,
) -> Result<IndexBuildReport, IngestError> {
    let batches = load_chunk_batches(processed_dir)?;
    let index_file = DiskIndex::index_file(index_dir);

    let mut entries = match mode {
        RebuildMode::Replace => Vec::new(),
        RebuildMode::Append if DiskIndex::exists(index_dir) => {
            let prior = DiskIndex::open(index_dir)
                .map_err(|error| IngestError::IndexBuild(error.to_string()))?;
            if prior.meta.embedding != *embedder.config() {
                return Err(IngestError::IndexBuild(format!(
                    "cannot append with embedding config {:?}; index was built with {:?}",
                    embedder.config(),
                    prior.meta.embedding
                )));
            }
            prior.entries
        }
        RebuildMode::Append => Vec::new(),
    };

    let source_count = batches.len();
    for batch in batches {
        for chunk in batch.chunks {
            let embedding = embedder.embed(&chunk.content)?;
            entries.push(IndexEntry {
                embedding,
                content: chunk.content,
                source: chunk.source,
                chunk_id: chunk.chunk_id,
            });
        }
    }

    if entries.is_empty() {
        info!(processed_dir = %processed_dir.display(), "no chunks to index; index untouched");
        return Ok(IndexBuildReport {
            entry_count: 0,
            source_count: 0,
            index_file,
            wrote_index: false,
        });
    }

    let file = IndexFile {
        meta: IndexMeta {
            embedding: embedder.config().clone(),
            entry_count: entries.len(),
            built_at: Utc::now(),
        },
        entries,
    };

    fs::create_dir_all(index_dir)?;
    let staging = index_file.with_extension("json.tmp");
    fs::write(&staging, serde_json::to_string(&file)?)?;
    fs::rename(&staging, &index_file)?;

    info!(
        entries = file.meta.entry_count,
        sources = source_count,
        path = %index_file.display(),
        "vector index built"
    );

    Ok(IndexBuildReport {
        entry_count: file.meta.entry_count,
        source_count,
        index_file,
        wrote_index: true,
    })
}

fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right.iter()).map(|(a, b)| a * b).sum()
}
