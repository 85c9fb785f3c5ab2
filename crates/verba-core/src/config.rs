//! Persisted config (corpus path, models, prompt settings) in the app data
//! directory. Every field is optional; accessors fill in defaults so a
//! missing or partial config file always yields a working setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::generator::GenerationParams;
use crate::history::DEFAULT_HISTORY_PAIRS;
use crate::ollama::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL};
use crate::pipeline::DEFAULT_TOP_K;
use crate::prompt::{PromptTemplate, DEFAULT_FALLBACK_SENTENCE, DEFAULT_PERSONA};

const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to the corpus artifact built by `verba build-corpus`.
    pub corpus_path: Option<String>,
    pub ollama_url: Option<String>,
    pub embed_model: Option<String>,
    pub chat_model: Option<String>,
    pub top_k: Option<usize>,
    pub history_pairs: Option<usize>,
    /// Assistant persona rendered into the prompt and system message.
    pub persona: Option<String>,
    /// Sentence the model emits verbatim when the context is insufficient.
    pub fallback_sentence: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Config {
    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn embed_model(&self) -> &str {
        self.embed_model.as_deref().unwrap_or(DEFAULT_EMBED_MODEL)
    }

    pub fn chat_model(&self) -> &str {
        self.chat_model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)
    }

    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    pub fn history_pairs(&self) -> usize {
        self.history_pairs.unwrap_or(DEFAULT_HISTORY_PAIRS)
    }

    pub fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            persona: self
                .persona
                .clone()
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            fallback_sentence: self
                .fallback_sentence
                .clone()
                .unwrap_or_else(|| DEFAULT_FALLBACK_SENTENCE.to_string()),
        }
    }

    pub fn generation_params(&self) -> GenerationParams {
        let defaults = GenerationParams::default();
        GenerationParams {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
        }
    }
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> Config {
    let Some(data_dir) = app_data::app_data_dir() else {
        return Config::default();
    };
    let path = data_dir.join(CONFIG_FILENAME);
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Config::default();
    };
    toml::from_str(&s).unwrap_or_default()
}

/// Save config to the app data directory.
pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    let path = data_dir.join(CONFIG_FILENAME);
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(&path, s).map_err(ConfigError::Write)
}

/// Get the configured corpus artifact path, if any.
pub fn get_corpus_path() -> Option<PathBuf> {
    load_config()
        .corpus_path
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Set and persist the corpus artifact path.
pub fn set_corpus_path(path: &Path) -> Result<(), ConfigError> {
    let path = path.canonicalize().map_err(ConfigError::Canonicalize)?;
    if !path.is_file() {
        return Err(ConfigError::NotAFile(path));
    }
    let mut config = load_config();
    config.corpus_path = Some(path.to_string_lossy().into_owned());
    save_config(&config)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
}
