//! Answer generation via an external completion service.
//!
//! Failures never cross this boundary: a broken backend turns into a fixed,
//! user-safe fallback answer, and the detail goes to the log. One attempt
//! per turn, no retries.

use thiserror::Error;

use crate::ollama::OllamaError;

/// Answer returned when the completion service fails in any way.
pub const FALLBACK_ANSWER: &str = "Sorry, I encountered an error while processing your request.";

/// Sampling settings for one completion. Kept low-temperature and short so
/// answers stay concise enough to speak aloud.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 500,
        }
    }
}

/// Chat-style completion backend: one system message, one user prompt.
#[allow(async_fn_in_trait)]
pub trait CompletionClient {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, CompletionError>;
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion backend error: {0}")]
    Backend(#[from] OllamaError),
    #[error("completion service unavailable: {0}")]
    Unavailable(String),
}

/// Wraps a completion client with the never-fail-the-turn policy.
#[derive(Debug)]
pub struct AnswerGenerator<C> {
    client: C,
    system: String,
    params: GenerationParams,
}

impl<C: CompletionClient> AnswerGenerator<C> {
    pub fn new(client: C, system: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            client,
            system: system.into(),
            params,
        }
    }

    /// Send the grounding prompt and return the answer text. On any backend
    /// failure the caller gets [`FALLBACK_ANSWER`]; the failure itself is
    /// logged, never raised.
    pub async fn generate(&self, prompt: &str) -> String {
        match self.client.complete(&self.system, prompt, &self.params).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "completion failed; returning fallback answer");
                FALLBACK_ANSWER.to_string()
            }
        }
    }
}
