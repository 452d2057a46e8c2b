use crate::extraction::extract_batch_text;
use chrono::Utc;
use domain::chunking::ChunkPolicy;
use domain::error::{PipelineError, PipelineResult};
use domain::models::{BuildReport, IndexManifest, PdfDocument, VectorIndex};
use domain::ports::{EmbeddingProvider, PageExtractor};
use infrastructure::embedder::Embedder;
use infrastructure::index_store::IndexStore;
use shared::telemetry::Telemetry;
use tracing::info;

/// The "Submit & Process" action: extract, chunk, embed, persist.
pub struct IngestService<X, E> {
    extractor: X,
    embeddings: E,
    store: IndexStore,
    policy: ChunkPolicy,
}

impl<X: PageExtractor, E: EmbeddingProvider> IngestService<X, E> {
    pub fn new(extractor: X, embeddings: E, store: IndexStore, policy: ChunkPolicy) -> Self {
        Self {
            extractor,
            embeddings,
            store,
            policy,
        }
    }

    /// Rebuild the index from `documents`. Any failure leaves the previously
    /// persisted index untouched.
    pub async fn process(&self, documents: &[PdfDocument]) -> PipelineResult<BuildReport> {
        let text = self.extract(documents)?;
        self.index_text(&text, documents.len()).await
    }

    /// The CPU-bound half of [`process`](Self::process): flatten every page
    /// of every document into one string.
    pub fn extract(&self, documents: &[PdfDocument]) -> PipelineResult<String> {
        info!(documents = documents.len(), "processing document batch");
        extract_batch_text(&self.extractor, documents)
    }

    /// Chunk, embed and persist already extracted text.
    pub async fn index_text(&self, text: &str, documents: usize) -> PipelineResult<BuildReport> {
        let telemetry = Telemetry::new();
        let characters = text.chars().count();
        let chunks = self.policy.split(text);
        if chunks.is_empty() {
            let reason = if documents == 0 {
                "no documents were uploaded"
            } else {
                "the uploaded documents contain no extractable text"
            };
            return Err(PipelineError::EmptyInput(reason.to_string()));
        }
        info!(characters, chunks = chunks.len(), "text chunked");

        let embedder = Embedder::new(&self.embeddings);
        let entries = embedder.generate_embeddings(&chunks).await?;
        let dimension = entries.first().map(|e| e.vector.len()).unwrap_or_default();

        let manifest = IndexManifest {
            embedding_model: embedder.model().to_string(),
            dimension,
            chunk_count: entries.len(),
            chunk_size: self.policy.chunk_size(),
            chunk_overlap: self.policy.overlap(),
            source_digest: format!("{:x}", md5::compute(text.as_bytes())),
            built_at: Utc::now(),
        };
        let index = VectorIndex { manifest, entries };
        self.store.save(&index)?;

        info!(
            chunks = index.len(),
            elapsed_ms = telemetry.elapsed().as_millis() as u64,
            "index rebuilt"
        );
        Ok(BuildReport {
            documents,
            characters,
            chunks: index.len(),
            manifest: index.manifest,
        })
    }
}
