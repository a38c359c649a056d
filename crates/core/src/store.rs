use crate::error::IngestError;
use crate::models::{Chunk, ChunkBatch};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Suffix of every chunk artifact in the processed directory.
pub const CHUNK_ARTIFACT_SUFFIX: &str = "_chunks.json";

/// Deterministic artifact path for a source file name:
/// `<processed_dir>/<stem>_chunks.json`.
pub fn artifact_path(processed_dir: &Path, source: &str) -> Result<PathBuf, IngestError> {
    let stem = Path::new(source)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| IngestError::MissingFileName(source.to_string()))?;
    Ok(processed_dir.join(format!("{stem}{CHUNK_ARTIFACT_SUFFIX}")))
}

/// Persist all chunks of one source as a single JSON artifact. Records with
/// empty content are never written. The artifact is written to a temporary
/// file and renamed into place so readers never observe a partial file.
pub fn write_chunk_batch(
    chunks: &[Chunk],
    source: &str,
    processed_dir: &Path,
) -> Result<PathBuf, IngestError> {
    fs::create_dir_all(processed_dir)?;
    let path = artifact_path(processed_dir, source)?;

    let records: Vec<&Chunk> = chunks
        .iter()
        .filter(|chunk| !chunk.content.trim().is_empty())
        .collect();
    let serialized = serde_json::to_string_pretty(&records)?;

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, serialized)?;
    fs::rename(&staging, &path)?;

    info!(source, chunks = records.len(), path = %path.display(), "wrote chunk artifact");
    Ok(path)
}

/// Load every chunk artifact under the processed directory, one batch per
/// source. A missing or empty directory is a zero-work result, not an
/// error. Empty-content records are dropped on load as well, so a
/// hand-edited artifact cannot smuggle them into the index.
pub fn load_chunk_batches(processed_dir: &Path) -> Result<Vec<ChunkBatch>, IngestError> {
    if !processed_dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(processed_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(CHUNK_ARTIFACT_SUFFIX))
        })
        .collect();
    paths.sort_unstable();

    let mut batches = Vec::new();
    for path in paths {
        let raw = fs::read_to_string(&path)?;
        let mut chunks: Vec<Chunk> = serde_json::from_str(&raw)?;
        chunks.retain(|chunk| !chunk.content.trim().is_empty());

        if let Some(first) = chunks.first() {
            batches.push(ChunkBatch {
                source: first.source.clone(),
                chunks,
            });
        }
    }

    Ok(batches)
}
