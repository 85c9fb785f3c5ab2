//! Assembles the grounding prompt: conversation context, retrieved chunks
//! in relevance order, and the instruction block.

use crate::history::{ConversationTurn, Role};
use crate::retriever::ScoredChunk;

/// Sentence the model must emit verbatim when the context is insufficient.
pub const DEFAULT_FALLBACK_SENTENCE: &str =
    "I don't have enough information in the provided context to answer this question.";

/// The persona is configuration, not identity; swap it per deployment.
pub const DEFAULT_PERSONA: &str =
    "a helpful assistant that answers questions about the provided documents";

/// Fixed wording around the retrieved context. Everything configurable
/// (persona, fallback sentence) lives here; the layout does not change.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub persona: String,
    pub fallback_sentence: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            fallback_sentence: DEFAULT_FALLBACK_SENTENCE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Render the grounding prompt. Chunks appear in the order given (the
    /// relevance order) separated by blank lines; the conversation window
    /// comes first, oldest turn first. Deterministic for identical inputs.
    pub fn assemble(
        &self,
        results: &[ScoredChunk],
        history: &[ConversationTurn],
        query: &str,
    ) -> String {
        let mut prompt = String::new();
        for turn in history {
            let label = match turn.role {
                Role::User => "Previous question: ",
                Role::Assistant => "Previous answer: ",
            };
            prompt.push_str(label);
            prompt.push_str(turn.text.trim());
            prompt.push('\n');
        }
        if !history.is_empty() {
            prompt.push('\n');
        }
        prompt.push_str("Context:\n");
        for result in results {
            prompt.push_str(&result.chunk.text);
            prompt.push_str("\n\n");
        }
        prompt.push_str("Based on the context above, answer this question: ");
        prompt.push_str(query);
        prompt.push_str("\n\nAnswer using only the context above. If the context doesn't contain relevant information, say \"");
        prompt.push_str(&self.fallback_sentence);
        prompt.push_str("\"\n\nAnswer in the voice of ");
        prompt.push_str(&self.persona);
        prompt.push_str(".\n\nAnswer:");
        prompt
    }

    /// System message for the completion call.
    pub fn system_message(&self) -> String {
        format!(
            "You are {}. Answer questions based only on the provided context.",
            self.persona
        )
    }
}
