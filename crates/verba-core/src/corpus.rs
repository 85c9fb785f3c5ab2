//! Precomputed embedding store, loaded once from a corpus artifact.
//!
//! The artifact is a JSON array of chunks whose embeddings were produced
//! offline by the same model and max-normalization used for queries.
//! The store is read-only after load; there is no mutation API.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A unit of precomputed, embedded corpus text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u64,
    pub text: String,
    /// Max-normalized embedding, same scheme as query vectors.
    pub embedding: Vec<f32>,
}

/// In-memory store of corpus chunks. Invariant: non-empty, with every
/// embedding the same length. A store that fails validation is never
/// constructed - callers see [`StoreState::Unavailable`] instead.
#[derive(Debug)]
pub struct EmbeddingStore {
    chunks: Vec<Chunk>,
    dimension: usize,
}

impl EmbeddingStore {
    /// Load and validate the corpus artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CorpusError::Read(path.to_path_buf(), e))?;
        let chunks: Vec<Chunk> =
            serde_json::from_str(&raw).map_err(|e| CorpusError::Parse(path.to_path_buf(), e))?;
        Self::from_chunks(chunks)
    }

    /// Validate chunks and build a store. The dimension is taken from the
    /// first chunk; every other chunk must match it.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self, CorpusError> {
        let Some(first) = chunks.first() else {
            return Err(CorpusError::Empty);
        };
        let dimension = first.embedding.len();
        for chunk in &chunks {
            if chunk.embedding.is_empty() {
                return Err(CorpusError::EmptyEmbedding(chunk.id));
            }
            if chunk.embedding.len() != dimension {
                return Err(CorpusError::DimensionMismatch {
                    id: chunk.id,
                    expected: dimension,
                    found: chunk.embedding.len(),
                });
            }
        }
        Ok(Self { chunks, dimension })
    }

    /// Write chunks out as a corpus artifact (pretty JSON).
    pub fn write_artifact(path: &Path, chunks: &[Chunk]) -> Result<(), CorpusError> {
        let json = serde_json::to_string_pretty(chunks)
            .map_err(|e| CorpusError::Serialize(path.to_path_buf(), e))?;
        std::fs::write(path, json).map_err(|e| CorpusError::Write(path.to_path_buf(), e))
    }

    /// Number of chunks. Always at least 1.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding length shared by every chunk and every query vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn chunk_at(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// All chunks, in artifact order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Fail-closed view of the store: either fully loaded or unavailable.
/// Every query against an unavailable store short-circuits to a fixed
/// "not initialized" reply instead of erroring per call.
#[derive(Debug)]
pub enum StoreState {
    Ready(EmbeddingStore),
    Unavailable,
}

impl StoreState {
    /// Load the artifact, absorbing any failure into `Unavailable`.
    /// The cause goes to the log, not to the caller.
    pub fn load(path: &Path) -> Self {
        match EmbeddingStore::load(path) {
            Ok(store) => {
                tracing::info!(
                    chunks = store.len(),
                    dimension = store.dimension(),
                    "corpus loaded"
                );
                StoreState::Ready(store)
            }
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "corpus unavailable");
                StoreState::Unavailable
            }
        }
    }

    pub fn ready(&self) -> Option<&EmbeddingStore> {
        match self {
            StoreState::Ready(store) => Some(store),
            StoreState::Unavailable => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus artifact {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse corpus artifact {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("failed to serialize corpus artifact {0}: {1}")]
    Serialize(PathBuf, serde_json::Error),
    #[error("failed to write corpus artifact {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("corpus artifact contains no chunks")]
    Empty,
    #[error("chunk {0} has an empty embedding")]
    EmptyEmbedding(u64),
    #[error("chunk {id} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        id: u64,
        expected: usize,
        found: usize,
    },
}
