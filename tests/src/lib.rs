//! In-memory stand-ins for the PDF, embedding and chat capabilities, used by
//! the end-to-end pipeline tests.

use domain::error::{PipelineError, PipelineResult};
use domain::models::PdfDocument;
use domain::ports::{ChatProvider, EmbeddingProvider, EmbeddingTask, PageExtractor};
use std::sync::{Arc, Mutex};

/// Separates pages inside a fake PDF.
pub const PAGE_BREAK: &str = "\u{c}";

/// Build a fake PDF whose pages are `pages`.
pub fn fake_pdf(name: &str, pages: &[&str]) -> PdfDocument {
    PdfDocument::new(name, pages.join(PAGE_BREAK).into_bytes())
}

/// Reads UTF-8 bytes, one page per form-feed separated segment.
/// Bytes that are not UTF-8 are an extraction error.
#[derive(Default)]
pub struct FakePdfExtractor;

impl PageExtractor for FakePdfExtractor {
    fn extract_pages(&self, name: &str, bytes: &[u8]) -> PipelineResult<Vec<String>> {
        let text = std::str::from_utf8(bytes).map_err(|e| PipelineError::Extraction {
            document: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(text.split(PAGE_BREAK).map(str::to_string).collect())
    }
}

pub const BAG_OF_WORDS_DIM: usize = 64;

/// Hashed bag-of-words vectors: texts sharing words point the same way.
pub struct BagOfWordsEmbedder {
    model: String,
}

impl BagOfWordsEmbedder {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; BAG_OF_WORDS_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let word = word.to_lowercase();
            let bucket = word
                .bytes()
                .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
                % BAG_OF_WORDS_DIM;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl EmbeddingProvider for BagOfWordsEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        _task: EmbeddingTask,
    ) -> PipelineResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }

    fn max_batch_size(&self) -> usize {
        3
    }
}

/// Replies with a canned answer and keeps every prompt it was sent.
#[derive(Clone)]
pub struct RecordingChat {
    reply: String,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl RecordingChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ChatProvider for RecordingChat {
    fn model(&self) -> &str {
        "recording-chat"
    }

    async fn complete(&self, prompt: &str, _temperature: f32) -> PipelineResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}
