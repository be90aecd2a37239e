//! Error types for the preprocessing and indexing pipeline.

use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by library operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    RecordStore(#[from] RecordStoreError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Structural violations of the raw corpus contract. All of these are fatal.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("source file not found at: {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("expected JSON root of {} to be a list of questions, found {found}", path.display())]
    MalformedRoot { path: PathBuf, found: &'static str },

    #[error("failed to parse {} as JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures reading or writing the intermediate flat record file.
#[derive(Debug, thiserror::Error)]
pub enum RecordStoreError {
    #[error("record store I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode record {question_id}: {source}")]
    Encode {
        question_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed record at {}:{line}: {source}", path.display())]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Embedding collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("failed to load embedding model: {0}")]
    ModelInit(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("embedding model returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("embedding task failed: {0}")]
    TaskFailed(String),

    #[error("embedder produces {embedder}-dimensional vectors but the table stores {table}")]
    DimensionMismatch { embedder: usize, table: usize },
}

/// Vector store failures.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("LanceDB error: {0}")]
    LanceDb(String),

    #[error("embedding dimension mismatch for {id}: expected {expected}, got {actual}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("stored metadata for {id} is unreadable: {reason}")]
    Metadata { id: String, reason: String },
}

/// Invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
