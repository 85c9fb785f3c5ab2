//! Query encoding: text to a vector in the corpus embedding space.
//!
//! Vectors are max-normalized (each element divided by the largest absolute
//! element), matching the normalization applied to the corpus offline. This
//! is deliberately not Euclidean normalization; queries and corpus must use
//! the identical scheme or similarity scores become incomparable.

use thiserror::Error;

use crate::ollama::{OllamaClient, OllamaError};

/// Encodes text into the corpus embedding space. Deterministic for a fixed
/// model: the same text always yields the same vector.
#[allow(async_fn_in_trait)]
pub trait Encoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError>;
}

/// Divide each element by the maximum absolute element. Zero and empty
/// vectors are returned unchanged.
pub fn max_normalize(v: &[f32]) -> Vec<f32> {
    let max = v.iter().fold(0.0f32, |m, x| m.max(x.abs()));
    if max <= 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / max).collect()
}

/// Encoder backed by an Ollama embedding model.
#[derive(Debug, Clone)]
pub struct OllamaEncoder {
    client: OllamaClient,
    /// Expected vector length; checked on every call when set.
    dimension: Option<usize>,
}

impl OllamaEncoder {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            dimension: None,
        }
    }

    /// Require a fixed output dimension, normally the store's. A mismatch
    /// means the wrong embedding model is configured and should be caught
    /// at startup (see `Pipeline::verify`), not per query.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }
}

impl Encoder for OllamaEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        let raw = self.client.embed(text).await?;
        if let Some(expected) = self.dimension {
            if raw.len() != expected {
                return Err(EncodeError::DimensionMismatch {
                    expected,
                    found: raw.len(),
                });
            }
        }
        Ok(max_normalize(&raw))
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("embedding model produced {found} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("embedding request failed: {0}")]
    Model(#[from] OllamaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_normalize_scales_by_largest_abs_element() {
        let v = max_normalize(&[2.0, -4.0, 1.0]);
        assert_eq!(v, vec![0.5, -1.0, 0.25]);
    }

    #[test]
    fn max_normalize_zero_vector_unchanged() {
        assert_eq!(max_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn max_normalize_empty_vector() {
        assert!(max_normalize(&[]).is_empty());
    }

    #[test]
    fn max_normalize_not_euclidean() {
        // Euclidean normalization of [3, 4] would be [0.6, 0.8].
        assert_eq!(max_normalize(&[3.0, 4.0]), vec![0.75, 1.0]);
    }

    /// Hash-based stand-in for the embedding model: fixed width, no state.
    struct StubEncoder;

    impl Encoder for StubEncoder {
        async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
            let mut v = vec![0.0f32; 4];
            for (i, b) in text.bytes().enumerate() {
                v[i % 4] += b as f32;
            }
            Ok(max_normalize(&v))
        }
    }

    #[tokio::test]
    async fn encode_is_deterministic_with_fixed_width() {
        let encoder = StubEncoder;
        let a = encoder.encode("what is rust?").await.unwrap();
        let b = encoder.encode("what is rust?").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[tokio::test]
    async fn encode_accepts_empty_input() {
        let encoder = StubEncoder;
        let v = encoder.encode("").await.unwrap();
        assert_eq!(v.len(), 4);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
