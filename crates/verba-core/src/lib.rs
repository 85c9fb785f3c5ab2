//! All backend logic independent of how the assistant is run (CLI or a voice
//! frontend).
//!
//! One pipeline invocation per user turn: the query text is encoded into the
//! corpus embedding space, the most similar chunks are retrieved, a grounding
//! prompt is assembled together with the recent conversation window, and the
//! completion model answers from that context. The corpus artifact is built
//! offline (see [indexer]) and loaded read-only at startup.
//!
//! Audio capture, transcription, and speech output live with the frontend;
//! this crate consumes and produces plain text.

pub mod app_data;
pub mod config;
pub mod corpus;
pub mod encoder;
pub mod generator;
pub mod history;
pub mod indexer;
pub mod ollama;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use app_data::app_data_dir;
pub use config::{get_corpus_path, load_config, set_corpus_path, Config, ConfigError};
pub use corpus::{Chunk, CorpusError, EmbeddingStore, StoreState};
pub use encoder::{max_normalize, EncodeError, Encoder, OllamaEncoder};
pub use generator::{AnswerGenerator, CompletionClient, CompletionError, GenerationParams, FALLBACK_ANSWER};
pub use history::{context_window, ConversationTurn, Role, DEFAULT_HISTORY_PAIRS};
pub use indexer::{build_corpus, IndexError, DEFAULT_MAX_CHARS};
pub use ollama::{OllamaClient, OllamaError};
pub use pipeline::{Pipeline, DEFAULT_TOP_K, UNINITIALIZED_ANSWER};
pub use prompt::{PromptTemplate, DEFAULT_FALLBACK_SENTENCE, DEFAULT_PERSONA};
pub use retriever::{cosine_similarity, retrieve, ScoredChunk};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "verba-core ready"
}
