//! The per-turn pipeline: encode -> retrieve -> assemble -> generate.
//!
//! Built once with injected collaborators, then invoked once per user turn.
//! Holds no mutable state; the store is read-only after construction, so one
//! pipeline can serve concurrent sessions.

use crate::corpus::StoreState;
use crate::encoder::{EncodeError, Encoder};
use crate::generator::{AnswerGenerator, CompletionClient};
use crate::history::{context_window, ConversationTurn, DEFAULT_HISTORY_PAIRS};
use crate::prompt::PromptTemplate;
use crate::retriever::retrieve;

/// Reply for every query while the corpus is unavailable. The encoder and
/// retriever are not consulted in that state.
pub const UNINITIALIZED_ANSWER: &str =
    "System not properly initialized. Please check data files.";

/// Default number of chunks retrieved per query.
pub const DEFAULT_TOP_K: usize = 3;

type PromptObserver = Box<dyn Fn(&str) + Send + Sync>;

pub struct Pipeline<E, C> {
    encoder: E,
    generator: AnswerGenerator<C>,
    store: StoreState,
    template: PromptTemplate,
    top_k: usize,
    history_pairs: usize,
    prompt_observer: Option<PromptObserver>,
}

impl<E: Encoder, C: CompletionClient> Pipeline<E, C> {
    pub fn new(
        encoder: E,
        generator: AnswerGenerator<C>,
        store: StoreState,
        template: PromptTemplate,
    ) -> Self {
        Self {
            encoder,
            generator,
            store,
            template,
            top_k: DEFAULT_TOP_K,
            history_pairs: DEFAULT_HISTORY_PAIRS,
            prompt_observer: None,
        }
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn with_history_pairs(mut self, pairs: usize) -> Self {
        self.history_pairs = pairs;
        self
    }

    /// Observe every assembled prompt, e.g. to dump it somewhere while
    /// debugging. Purely a side channel; the prompt is not altered.
    pub fn with_prompt_observer(mut self, observer: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.prompt_observer = Some(Box::new(observer));
        self
    }

    pub fn store(&self) -> &StoreState {
        &self.store
    }

    /// Startup probe: encode once and compare shapes with the store. A
    /// dimension mismatch means the wrong embedding model is configured;
    /// treat it as fatal here rather than discovering it per query.
    pub async fn verify(&self) -> Result<(), EncodeError> {
        let Some(store) = self.store.ready() else {
            return Ok(());
        };
        let probe = self.encoder.encode("dimension probe").await?;
        if probe.len() != store.dimension() {
            return Err(EncodeError::DimensionMismatch {
                expected: store.dimension(),
                found: probe.len(),
            });
        }
        Ok(())
    }

    /// Answer one user turn. `history` is the session transcript excluding
    /// the turn being answered; only the last few complete question/answer
    /// pairs are carried into the prompt.
    ///
    /// Generation failures are absorbed into a fallback answer below this
    /// call; only encoding failures surface as errors.
    pub async fn answer(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<String, EncodeError> {
        let Some(store) = self.store.ready() else {
            return Ok(UNINITIALIZED_ANSWER.to_string());
        };
        let vector = self.encoder.encode(query).await?;
        let results = retrieve(&vector, store.chunks(), self.top_k);
        let window = context_window(history, self.history_pairs);
        let prompt = self.template.assemble(&results, window, query);
        tracing::debug!(
            retrieved = results.len(),
            history_turns = window.len(),
            "assembled grounding prompt"
        );
        if let Some(observer) = &self.prompt_observer {
            observer(&prompt);
        }
        Ok(self.generator.generate(&prompt).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::corpus::{Chunk, EmbeddingStore};
    use crate::generator::{CompletionError, GenerationParams, FALLBACK_ANSWER};
    use crate::prompt::DEFAULT_FALLBACK_SENTENCE;

    /// Maps known texts to fixed unit-ish vectors; counts invocations.
    struct StubEncoder {
        calls: Arc<AtomicUsize>,
    }

    impl StubEncoder {
        fn new() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl Encoder for StubEncoder {
        async fn encode(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(stub_vector(text))
        }
    }

    /// Deterministic toy embedding: axis per topic, [0,0,0] otherwise.
    fn stub_vector(text: &str) -> Vec<f32> {
        let t = text.to_lowercase();
        if t.contains("python") {
            vec![1.0, 0.0, 0.0]
        } else if t.contains("paris") {
            vec![0.0, 1.0, 0.0]
        } else if t.contains("cat") {
            vec![0.0, 0.0, 1.0]
        } else {
            vec![0.0, 0.0, 0.0]
        }
    }

    /// Records the prompt it is handed and returns a canned answer.
    struct RecordingClient {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl CompletionClient for RecordingClient {
        async fn complete(
            &self,
            _system: &str,
            prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, CompletionError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok("stub answer".to_string())
        }
    }

    struct FailingClient;

    impl CompletionClient for FailingClient {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, CompletionError> {
            Err(CompletionError::Unavailable("timeout".to_string()))
        }
    }

    fn test_store() -> StoreState {
        let chunks = vec![
            Chunk {
                id: 0,
                text: "Python is a programming language.".to_string(),
                embedding: stub_vector("python"),
            },
            Chunk {
                id: 1,
                text: "Paris is the capital of France.".to_string(),
                embedding: stub_vector("paris"),
            },
            Chunk {
                id: 2,
                text: "Cats are mammals.".to_string(),
                embedding: stub_vector("cat"),
            },
        ];
        StoreState::Ready(EmbeddingStore::from_chunks(chunks).unwrap())
    }

    fn recording_pipeline(
        store: StoreState,
    ) -> (Pipeline<StubEncoder, RecordingClient>, Arc<Mutex<Vec<String>>>, Arc<AtomicUsize>) {
        let (encoder, calls) = StubEncoder::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = RecordingClient { seen: seen.clone() };
        let generator = AnswerGenerator::new(client, "system", GenerationParams::default());
        let pipeline = Pipeline::new(encoder, generator, store, PromptTemplate::default());
        (pipeline, seen, calls)
    }

    #[tokio::test]
    async fn end_to_end_ranks_matching_chunk_first() {
        let (pipeline, seen, _) = recording_pipeline(test_store());
        let answer = pipeline
            .answer("What language is Python?", &[])
            .await
            .unwrap();
        assert_eq!(answer, "stub answer");

        let prompts = seen.lock().unwrap();
        let prompt = &prompts[0];
        // Best match first, and with k=3 over 3 chunks nothing is dropped.
        let python = prompt.find("Python is a programming language.").unwrap();
        let paris = prompt.find("Paris is the capital of France.").unwrap();
        let cats = prompt.find("Cats are mammals.").unwrap();
        assert!(python < paris.min(cats));
        assert!(prompt.contains("What language is Python?"));
        assert!(prompt.contains(DEFAULT_FALLBACK_SENTENCE));
    }

    #[tokio::test]
    async fn unavailable_store_short_circuits_without_encoding() {
        let (pipeline, seen, calls) = recording_pipeline(StoreState::Unavailable);
        let answer = pipeline.answer("anything", &[]).await.unwrap();
        assert_eq!(answer, UNINITIALIZED_ANSWER);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_becomes_fallback_answer() {
        let (encoder, _) = StubEncoder::new();
        let generator =
            AnswerGenerator::new(FailingClient, "system", GenerationParams::default());
        let pipeline = Pipeline::new(encoder, generator, test_store(), PromptTemplate::default());
        let answer = pipeline.answer("What about Paris?", &[]).await.unwrap();
        assert_eq!(answer, FALLBACK_ANSWER);
    }

    #[tokio::test]
    async fn history_window_flows_into_prompt() {
        let (pipeline, seen, _) = recording_pipeline(test_store());
        let history = vec![
            ConversationTurn::user("What language is Python?"),
            ConversationTurn::assistant("Python is a programming language."),
        ];
        pipeline
            .answer("Who created it?", &history)
            .await
            .unwrap();
        let prompts = seen.lock().unwrap();
        assert!(prompts[0].contains("Previous question: What language is Python?"));
        assert!(prompts[0].contains("Previous answer: Python is a programming language."));
    }

    #[tokio::test]
    async fn verify_catches_dimension_mismatch() {
        let (encoder, _) = StubEncoder::new();
        let generator = AnswerGenerator::new(FailingClient, "system", GenerationParams::default());
        // Store with 2-dimensional embeddings; stub encoder emits 3.
        let store = StoreState::Ready(
            EmbeddingStore::from_chunks(vec![Chunk {
                id: 0,
                text: "short".to_string(),
                embedding: vec![1.0, 0.0],
            }])
            .unwrap(),
        );
        let pipeline = Pipeline::new(encoder, generator, store, PromptTemplate::default());
        assert!(matches!(
            pipeline.verify().await,
            Err(EncodeError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[tokio::test]
    async fn verify_passes_on_matching_dimensions() {
        let (pipeline, _, _) = recording_pipeline(test_store());
        pipeline.verify().await.unwrap();
    }

    #[tokio::test]
    async fn prompt_observer_sees_assembled_prompt() {
        let (encoder, _) = StubEncoder::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let client = RecordingClient { seen: seen.clone() };
        let generator = AnswerGenerator::new(client, "system", GenerationParams::default());
        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = observed.clone();
        let pipeline = Pipeline::new(encoder, generator, test_store(), PromptTemplate::default())
            .with_prompt_observer(move |p| sink.lock().unwrap().push(p.to_string()));
        pipeline.answer("cats?", &[]).await.unwrap();
        let observed = observed.lock().unwrap();
        let sent = seen.lock().unwrap();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0], sent[0]);
    }
}
