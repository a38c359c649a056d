use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("csv parse error: {0}")]
    CsvParse(#[from] csv::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("unsupported source type: {0}")]
    UnsupportedSource(String),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("index build error: {0}")]
    IndexBuild(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid embedding endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("embedding backend returned {status}: {details}")]
    Backend { status: String, details: String },

    #[error("embedding dimension {actual} does not match configured {expected}")]
    Dimensions { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("vector index not found at {}; run the index build first", .0.display())]
    IndexNotFound(PathBuf),

    #[error("malformed index file {}: {details}", path.display())]
    MalformedIndex { path: PathBuf, details: String },

    #[error("query embedder produces {embedder} dimensions but the index was built with {index}")]
    DimensionMismatch { embedder: usize, index: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
