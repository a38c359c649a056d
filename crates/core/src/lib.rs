pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod retriever;
pub mod store;

pub use chunking::{
    build_chunks, normalize_text, options_for_source, profile_rules, split_text, ProfileRule,
};
pub use embeddings::{
    embedder_from_env, Embedder, EmbeddingConfig, HashedNgramEmbedder, HttpEmbedder,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
};
pub use error::{EmbedError, IngestError, RetrieveError};
pub use extractor::{extract_csv_rows, extract_units, LopdfExtractor, PdfExtractor, SourceKind};
pub use index::{build_index, DiskIndex, IndexBuildReport, IndexEntry, IndexMeta, VectorIndex};
pub use ingest::{digest_file, discover_source_files, ingest_corpus};
pub use models::{
    Chunk, ChunkBatch, ChunkingOptions, IngestionReport, RebuildMode, RetrievedChunk,
    SkippedSource, SourceSummary,
};
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use store::{artifact_path, load_chunk_batches, write_chunk_batch, CHUNK_ARTIFACT_SUFFIX};
