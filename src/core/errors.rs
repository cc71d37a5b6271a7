use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy of the retrieval engine.
///
/// Every variant is reported to the caller; nothing here is downgraded to a
/// default answer. The CLI maps each kind to a stable exit code via
/// [`RagError::exit_code`].
#[derive(Debug, Error)]
pub enum RagError {
    /// `build` was handed an empty chunk set.
    #[error("corpus is empty: nothing to index")]
    EmptyCorpus,

    /// The embedding provider failed or timed out.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// A vector's dimension does not match the index dimension.
    #[error("dimension mismatch: expected {expected}D, got {actual}D")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A persisted index is present but unusable.
    #[error("corrupt index at {}: {reason}", .path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    /// No persisted index exists at the given path.
    #[error("no index found at {}", .0.display())]
    NotFound(PathBuf),

    /// No index has been built or loaded yet.
    #[error("no active index: build or load one first")]
    NoIndex,

    /// The question was blank or whitespace-only.
    #[error("query is empty")]
    EmptyQuery,

    /// The language model failed or timed out.
    #[error("generation request failed: {0}")]
    Generation(String),

    /// Persistence I/O failure that is neither absence nor corruption.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        RagError::CorruptIndex {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Stable code for logging and metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            RagError::EmptyCorpus => "EMPTY_CORPUS",
            RagError::Embedding(_) => "EMBEDDING_FAILED",
            RagError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            RagError::CorruptIndex { .. } => "CORRUPT_INDEX",
            RagError::NotFound(_) => "NOT_FOUND",
            RagError::NoIndex => "NO_INDEX",
            RagError::EmptyQuery => "EMPTY_QUERY",
            RagError::Generation(_) => "GENERATION_FAILED",
            RagError::Io(_) => "IO_ERROR",
        }
    }

    /// Process exit code for the CLI, one per error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            RagError::EmptyCorpus => 2,
            RagError::Embedding(_) => 3,
            RagError::DimensionMismatch { .. } => 4,
            RagError::CorruptIndex { .. } => 5,
            RagError::NotFound(_) => 6,
            RagError::NoIndex => 7,
            RagError::EmptyQuery => 8,
            RagError::Generation(_) => 9,
            RagError::Io(_) => 10,
        }
    }
}
