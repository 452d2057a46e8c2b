//! Capabilities the pipeline depends on but does not implement.

use crate::error::PipelineResult;
use std::future::Future;

/// Turns the raw bytes of one PDF into per-page text.
pub trait PageExtractor {
    /// Returns one entry per page, in page order. Pages without text yield `""`.
    fn extract_pages(&self, name: &str, bytes: &[u8]) -> PipelineResult<Vec<String>>;
}

/// What an embedding will be used for. Some providers embed the two sides
/// of a retrieval differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    Document,
    Query,
}

/// A hosted text-embedding model.
pub trait EmbeddingProvider {
    /// Identifier recorded in the index manifest and checked at query time.
    fn model(&self) -> &str;

    /// Embed `texts`, returning one vector per input in the same order.
    fn embed_batch(
        &self,
        texts: &[String],
        task: EmbeddingTask,
    ) -> impl Future<Output = PipelineResult<Vec<Vec<f32>>>> + Send;

    /// Largest number of texts accepted by a single `embed_batch` call.
    fn max_batch_size(&self) -> usize {
        100
    }
}

/// A hosted chat-completion model.
pub trait ChatProvider {
    fn model(&self) -> &str;

    fn complete(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> impl Future<Output = PipelineResult<String>> + Send;
}
