//! Fixed-size, overlapping character windows.
//!
//! Boundaries depend only on character counts: no sentence or paragraph
//! detection. For chunk size `L` and overlap `O`, chunk `i + 1` starts `O`
//! characters before chunk `i` ends, so dropping the first `O` characters of
//! every chunk after the first and concatenating gives back the input.

use crate::error::{PipelineError, PipelineResult};
use crate::models::TextChunk;

pub const DEFAULT_CHUNK_SIZE: usize = 10_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 1_000;

/// Only constructible through [`ChunkPolicy::new`] or `Default`, so
/// `overlap < chunk_size` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    chunk_size: usize,
    overlap: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkPolicy {
    /// Requires `chunk_size > 0` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> PipelineResult<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(PipelineError::InvalidChunkPolicy {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let rest = &text[start..];
            // One pass over at most `chunk_size` chars finds both the end of
            // this window and the start of the next.
            let mut end = rest.len();
            let mut next = None;
            for (count, (offset, _)) in rest.char_indices().enumerate() {
                if count == step {
                    next = Some(offset);
                }
                if count == self.chunk_size {
                    end = offset;
                    break;
                }
            }
            chunks.push(TextChunk {
                position: chunks.len(),
                text: rest[..end].to_string(),
            });
            match next {
                Some(offset) if end < rest.len() => start += offset,
                _ => break,
            }
        }
        chunks
    }
}
