use domain::error::{PipelineError, PipelineResult};
use domain::models::{Answer, ScoredChunk};
use domain::ports::{ChatProvider, EmbeddingProvider};
use domain::prompt::{build_context, QaPrompt};
use infrastructure::embedder::Embedder;
use infrastructure::index_store::IndexStore;
use infrastructure::search::SearchEngine;
use shared::telemetry::Telemetry;
use tracing::{debug, info};

/// A rendered prompt together with the passages that went into it.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub sources: Vec<ScoredChunk>,
    pub prompt: String,
}

/// Answers one question against the last persisted index. Holds no state
/// between questions; the index is re-read every time.
pub struct AnswerService<E, C> {
    embeddings: E,
    chat: C,
    store: IndexStore,
    top_k: usize,
    temperature: f32,
}

impl<E: EmbeddingProvider, C: ChatProvider> AnswerService<E, C> {
    pub fn new(embeddings: E, chat: C, store: IndexStore, top_k: usize, temperature: f32) -> Self {
        Self {
            embeddings,
            chat,
            store,
            top_k,
            temperature,
        }
    }

    /// Nearest chunks for `question`, checked against the model the index was built with.
    pub async fn retrieve(&self, question: &str) -> PipelineResult<Vec<ScoredChunk>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        let index = self.store.load()?;
        let embedder = Embedder::new(&self.embeddings);
        if index.manifest.embedding_model != embedder.model() {
            return Err(PipelineError::EmbeddingModelMismatch {
                index_model: index.manifest.embedding_model.clone(),
                requested_model: embedder.model().to_string(),
            });
        }

        let query_embedding = embedder.embed_query(question).await?;
        let hits = SearchEngine::top_k(&index, &query_embedding, self.top_k)?;
        debug!(
            hits = hits.len(),
            positions = ?hits.iter().map(|h| h.position).collect::<Vec<_>>(),
            "retrieved chunks"
        );
        Ok(hits)
    }

    pub async fn prepare(&self, question: &str) -> PipelineResult<PreparedPrompt> {
        let sources = self.retrieve(question).await?;
        let context = build_context(&sources);
        let prompt = QaPrompt::new(&context, question.trim()).render();
        Ok(PreparedPrompt { sources, prompt })
    }

    /// Retrieve, render the prompt, and return the chat model's reply unmodified.
    pub async fn answer(&self, question: &str) -> PipelineResult<Answer> {
        let telemetry = Telemetry::new();
        let prepared = self.prepare(question).await?;
        let text = self.chat.complete(&prepared.prompt, self.temperature).await?;
        let elapsed = telemetry.elapsed();
        info!(
            model = %self.chat.model(),
            sources = prepared.sources.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "answer generated"
        );
        Ok(Answer {
            text,
            sources: prepared.sources,
            elapsed_ms: elapsed.as_millis(),
        })
    }
}
