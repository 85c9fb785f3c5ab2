//! Conversation turns, owned by the session layer (CLI, voice frontend).
//! The core only reads a bounded suffix; it never appends or mutates.

use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One utterance in the session transcript.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: SystemTime,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: SystemTime::now(),
        }
    }
}

/// Default number of question/answer pairs carried into the prompt.
pub const DEFAULT_HISTORY_PAIRS: usize = 2;

/// The last `max_pairs` complete question/answer pairs before the current
/// query. `turns` must already exclude the turn being answered. A trailing
/// unanswered question is skipped; only (user, assistant) pairs count.
pub fn context_window(turns: &[ConversationTurn], max_pairs: usize) -> &[ConversationTurn] {
    let mut end = turns.len();
    while end > 0 && turns[end - 1].role != Role::Assistant {
        end -= 1;
    }
    let mut start = end;
    let mut pairs = 0;
    while pairs < max_pairs
        && start >= 2
        && turns[start - 2].role == Role::User
        && turns[start - 1].role == Role::Assistant
    {
        start -= 2;
        pairs += 1;
    }
    &turns[start..end]
}
