use domain::error::{PipelineError, PipelineResult};
use domain::models::{Embedding, TextChunk};
use domain::ports::{EmbeddingProvider, EmbeddingTask};
use tracing::{debug, info};

/// Drives an [`EmbeddingProvider`] over a whole chunk sequence.
pub struct Embedder<'a, P> {
    provider: &'a P,
}

impl<'a, P: EmbeddingProvider> Embedder<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Embed every chunk, one batch at a time, keeping chunk order.
    /// Fails without partial output if any batch fails or the vectors disagree on dimension.
    pub async fn generate_embeddings(&self, chunks: &[TextChunk]) -> PipelineResult<Vec<Embedding>> {
        let batch_size = self.provider.max_batch_size().max(1);
        let mut embeddings = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            debug!(count = batch.len(), "generating embeddings for batch");
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self
                .provider
                .embed_batch(&texts, EmbeddingTask::Document)
                .await?;
            if vectors.len() != batch.len() {
                return Err(PipelineError::upstream(
                    "embedding",
                    format!("expected {} vectors, received {}", batch.len(), vectors.len()),
                ));
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                embeddings.push(Embedding {
                    position: chunk.position,
                    vector,
                    text: chunk.text.clone(),
                });
            }
        }

        check_dimensions(&embeddings)?;
        info!(chunks = embeddings.len(), model = %self.model(), "embeddings generated");
        Ok(embeddings)
    }

    pub async fn embed_query(&self, question: &str) -> PipelineResult<Vec<f32>> {
        let mut vectors = self
            .provider
            .embed_batch(&[question.to_string()], EmbeddingTask::Query)
            .await?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() && !vector.is_empty() => Ok(vector),
            _ => Err(PipelineError::upstream(
                "embedding",
                "expected exactly one non-empty query vector",
            )),
        }
    }
}

fn check_dimensions(embeddings: &[Embedding]) -> PipelineResult<()> {
    let Some(first) = embeddings.first() else {
        return Ok(());
    };
    let expected = first.vector.len();
    if expected == 0 {
        return Err(PipelineError::upstream("embedding", "received an empty vector"));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.vector.len() != expected) {
        return Err(PipelineError::DimensionMismatch {
            expected,
            actual: bad.vector.len(),
        });
    }
    Ok(())
}
