//! Ranks corpus chunks by cosine similarity to a query vector.

use std::cmp::Ordering;

use crate::corpus::Chunk;

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
}

/// Cosine similarity between two vectors. Defined as 0 when either norm
/// is 0, so degenerate (all-zero) vectors rank last instead of dividing
/// by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let dot: f32 = (0..n).map(|i| a[i] * b[i]).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every chunk against the query and return the top `k`, best first.
/// Equal scores are broken by lowest chunk id, so an unchanged corpus always
/// yields the same result for the same query. Asking for more chunks than
/// exist just returns everything, sorted; an empty slice yields an empty
/// result.
pub fn retrieve(query: &[f32], chunks: &[Chunk], k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .map(|chunk| ScoredChunk {
            score: cosine_similarity(query, &chunk.embedding),
            chunk: chunk.clone(),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.chunk.id.cmp(&b.chunk.id))
    });
    scored.truncate(k);
    scored
}
