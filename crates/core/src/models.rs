use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The atomic retrievable unit, and the exact record shape persisted in
/// chunk artifacts: `{source, chunk_id, content}`.
///
/// `chunk_id` is 1-based and sequential within one source file. Chunks with
/// empty content after normalization are never constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    pub chunk_id: u64,
    pub content: String,
}

/// All chunks for one source file, written together as one artifact.
#[derive(Debug, Clone)]
pub struct ChunkBatch {
    pub source: String,
    pub chunks: Vec<Chunk>,
}

/// One retrieval hit: chunk content plus its metadata and similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub source: String,
    pub chunk_id: u64,
    pub score: f32,
}

/// Window size and overlap for the chunker, plus the separator priority
/// list tried from coarsest to finest.
#[derive(Debug, Clone)]
pub struct ChunkingOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub separators: Vec<String>,
}

impl ChunkingOptions {
    pub fn prose() -> Self {
        Self {
            chunk_size: 800,
            overlap: 150,
            separators: default_separators(),
        }
    }

    /// Profile for structural legal documents: split on section markers
    /// before falling back to prose boundaries.
    pub fn structural() -> Self {
        let mut separators: Vec<String> = [
            "Article", "ARTICLE", "article", "Part", "PART", "Schedule", "SCHEDULE",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        separators.extend(default_separators());

        Self {
            chunk_size: 1_000,
            overlap: 100,
            separators,
        }
    }
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self::prose()
    }
}

fn default_separators() -> Vec<String> {
    ["\n\n", "\n", ". ", " "].into_iter().map(str::to_string).collect()
}

/// Whether an index build replaces the persisted index or merges into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildMode {
    Replace,
    Append,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub checksum: String,
    pub num_chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one ingestion run. An empty raw directory produces an empty
/// report, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub sources: Vec<SourceSummary>,
    pub skipped: Vec<SkippedSource>,
    pub finished_at: DateTime<Utc>,
}

impl IngestionReport {
    pub fn total_chunks(&self) -> usize {
        self.sources.iter().map(|summary| summary.num_chunks).sum()
    }
}
