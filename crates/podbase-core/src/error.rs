use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy for the whole pipeline. Per-item failures are caught at
/// the smallest enclosing scope and recorded through the error log; only
/// resource-acquisition failures abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("text processing failed: {0}")]
    TextProcessing(String),

    #[error("tag extraction failed: {0}")]
    TagExtraction(String),

    #[error("vectorization failed: {0}")]
    Vectorization(String),

    #[error("vector store write failed: {0}")]
    VectorStoreWrite(String),

    #[error("stage sync failed: {0}")]
    Sync(String),

    #[error("record validation failed: {0}")]
    Validation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::TextProcessing(_) => ErrorKind::TextProcessing,
            PipelineError::TagExtraction(_) => ErrorKind::TagExtraction,
            PipelineError::Vectorization(_) => ErrorKind::Vectorization,
            PipelineError::VectorStoreWrite(_) => ErrorKind::VectorStoreWrite,
            PipelineError::Sync(_) => ErrorKind::Sync,
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Config(_) => ErrorKind::Config,
            PipelineError::Io(_) => ErrorKind::Io,
            PipelineError::General(_) => ErrorKind::General,
        }
    }
}

/// Classification labels used by error records and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "TextProcessingError")]
    TextProcessing,
    #[serde(rename = "TagExtractionError")]
    TagExtraction,
    #[serde(rename = "VectorizationError")]
    Vectorization,
    #[serde(rename = "VectorStoreWriteError")]
    VectorStoreWrite,
    #[serde(rename = "SyncError")]
    Sync,
    #[serde(rename = "ValidationError")]
    Validation,
    #[serde(rename = "ConfigError")]
    Config,
    #[serde(rename = "IoError")]
    Io,
    #[serde(rename = "GeneralError")]
    General,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TextProcessing => "TextProcessingError",
            ErrorKind::TagExtraction => "TagExtractionError",
            ErrorKind::Vectorization => "VectorizationError",
            ErrorKind::VectorStoreWrite => "VectorStoreWriteError",
            ErrorKind::Sync => "SyncError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Io => "IoError",
            ErrorKind::General => "GeneralError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
