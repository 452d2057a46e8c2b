use domain::error::{PipelineError, PipelineResult};
use domain::models::{ScoredChunk, VectorIndex};

pub struct SearchEngine;

impl SearchEngine {
    /// Cosine similarity. Zero-length vectors, and vectors large enough to
    /// overflow, score 0 rather than NaN.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        let similarity = dot_product / (norm_a * norm_b);
        if similarity.is_finite() {
            similarity
        } else {
            0.0
        }
    }

    /// The `top_k` most similar chunks, nearest first. Equal scores keep
    /// original chunk order.
    pub fn top_k(
        index: &VectorIndex,
        query_embedding: &[f32],
        top_k: usize,
    ) -> PipelineResult<Vec<ScoredChunk>> {
        if !index.is_empty() && query_embedding.len() != index.manifest.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: index.manifest.dimension,
                actual: query_embedding.len(),
            });
        }

        let mut similarities: Vec<(f32, usize, &str)> = index
            .entries
            .iter()
            .map(|emb| {
                (
                    Self::cosine_similarity(query_embedding, &emb.vector),
                    emb.position,
                    &emb.text[..],
                )
            })
            .collect();

        similarities.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(similarities
            .into_iter()
            .take(top_k)
            .map(|(score, position, text)| ScoredChunk {
                position,
                score,
                text: text.to_string(),
            })
            .collect())
    }
}
