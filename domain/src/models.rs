use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded PDF. The name only shows up in logs and error messages.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PdfDocument {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// A window of the flattened document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Zero-based order of the chunk in the source text.
    pub position: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub position: usize,
    pub vector: Vec<f32>,
    pub text: String,
}

/// Facts recorded alongside the vectors when an index is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// MD5 of the flattened source text, hex encoded.
    pub source_digest: String,
    pub built_at: DateTime<Utc>,
}

/// A fully loaded index, ready to be searched.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    pub manifest: IndexManifest,
    /// Ordered by `position`.
    pub entries: Vec<Embedding>,
}

impl VectorIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub position: usize,
    pub score: f32,
    pub text: String,
}

/// Summary of a finished "Submit & Process" action.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub characters: usize,
    pub chunks: usize,
    pub manifest: IndexManifest,
}

/// The model's reply to one question, with the passages it was shown.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<ScoredChunk>,
    pub elapsed_ms: u128,
}

impl Answer {
    /// Whether the model replied with the "not in context" sentinel.
    /// Informational only; the model is not guaranteed to honour it.
    pub fn is_sentinel(&self) -> bool {
        self.text
            .to_lowercase()
            .contains(crate::prompt::NOT_IN_CONTEXT)
    }
}
