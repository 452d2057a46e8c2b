use std::path::PathBuf;
use thiserror::Error;

/// Every failure the document pipeline can surface to a caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A document could not be read as a PDF at all.
    #[error("failed to extract text from '{document}': {reason}")]
    Extraction { document: String, reason: String },

    /// Nothing to index: no documents, or the documents held no text.
    #[error("no text to index: {0}")]
    EmptyInput(String),

    #[error("invalid chunk policy: chunk size {chunk_size}, overlap {overlap}")]
    InvalidChunkPolicy { chunk_size: usize, overlap: usize },

    #[error("question must not be empty")]
    EmptyQuestion,

    /// Query attempted before any index was built.
    #[error("index not found at {}; process some documents first", .0.display())]
    IndexNotFound(PathBuf),

    #[error(
        "embedding model mismatch: index was built with '{index_model}', but '{requested_model}' is configured"
    )]
    EmbeddingModelMismatch {
        index_model: String,
        requested_model: String,
    },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding or chat service unreachable, rejected the call, or answered garbage.
    #[error("{capability} service error: {message}")]
    Upstream {
        capability: &'static str,
        message: String,
    },

    #[error("index storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn upstream(capability: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            capability,
            message: message.into(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
