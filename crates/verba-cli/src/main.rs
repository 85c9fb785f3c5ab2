//! CLI entry point for the Verba backend (for dev and testing).
//!
//! Stands in for the voice frontend: `ask` is one transcribed turn, `chat`
//! is a whole session with history carried between turns.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use verba_core::{
    app_data_dir, build_corpus, get_corpus_path, load_config, set_corpus_path, status, AnswerGenerator,
    Config, ConversationTurn, OllamaClient, OllamaEncoder, Pipeline, StoreState, DEFAULT_MAX_CHARS,
};

#[derive(Parser)]
#[command(name = "verba")]
#[command(about = "Verba: voice-ready question answering over your own documents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where Verba stores its config (app data directory).
    DataDir,
    /// Chunk and embed a directory of .md/.txt documents into a corpus artifact.
    BuildCorpus {
        /// Directory of source documents.
        #[arg(value_name = "DOCS")]
        docs: PathBuf,
        /// Where to write the artifact.
        #[arg(value_name = "ARTIFACT")]
        artifact: PathBuf,
        /// Maximum characters per chunk.
        #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
        max_chars: usize,
    },
    /// Remember a corpus artifact path so ask/chat can omit --corpus.
    SetCorpus {
        #[arg(value_name = "ARTIFACT")]
        path: PathBuf,
    },
    /// Answer a single question against the corpus.
    Ask {
        #[arg(value_name = "QUESTION")]
        question: String,
        /// Corpus artifact (overrides the configured one).
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Interactive multi-turn session. Ctrl-D or "exit" to quit.
    Chat {
        #[arg(long)]
        corpus: Option<PathBuf>,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("Verba backend");
            println!("  core: {}", status());
        }
        Commands::DataDir => match app_data_dir() {
            Some(p) => println!("{}", p.display()),
            None => eprintln!("Could not determine app data directory."),
        },
        Commands::BuildCorpus {
            docs,
            artifact,
            max_chars,
        } => {
            let config = load_config();
            let client = match ollama_client(&config) {
                Ok(c) => c,
                Err(e) => return eprintln!("Error: {}", e),
            };
            match build_corpus(&docs, &artifact, &client, max_chars).await {
                Ok(n) => println!("Wrote {} chunk(s) to {}", n, artifact.display()),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
        Commands::SetCorpus { path } => match set_corpus_path(&path) {
            Ok(()) => println!("Corpus set to {}", path.display()),
            Err(e) => eprintln!("Error: {}", e),
        },
        Commands::Ask {
            question,
            corpus,
            top_k,
        } => {
            let Some(pipeline) = build_pipeline(corpus, top_k).await else {
                return;
            };
            match pipeline.answer(&question, &[]).await {
                Ok(answer) => println!("{}", answer),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
        Commands::Chat { corpus, top_k } => {
            let Some(pipeline) = build_pipeline(corpus, top_k).await else {
                return;
            };
            run_chat(&pipeline).await;
        }
    }
}

fn ollama_client(config: &Config) -> Result<OllamaClient, verba_core::OllamaError> {
    Ok(OllamaClient::from_url(config.ollama_url())?
        .with_embed_model(config.embed_model())
        .with_chat_model(config.chat_model()))
}

/// Wire up the pipeline from config plus CLI overrides. Prints and bails on
/// misconfiguration (bad URL, embedding dimension mismatch).
async fn build_pipeline(
    corpus: Option<PathBuf>,
    top_k: Option<usize>,
) -> Option<Pipeline<OllamaEncoder, OllamaClient>> {
    let config = load_config();
    let client = match ollama_client(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return None;
        }
    };

    let store = match corpus.or_else(get_corpus_path) {
        Some(path) => StoreState::load(&path),
        None => {
            eprintln!("No corpus configured; run `verba build-corpus` and `verba set-corpus` first.");
            StoreState::Unavailable
        }
    };

    let mut encoder = OllamaEncoder::new(client.clone());
    if let Some(s) = store.ready() {
        encoder = encoder.with_dimension(s.dimension());
    }
    let template = config.prompt_template();
    let generator =
        AnswerGenerator::new(client, template.system_message(), config.generation_params());
    let pipeline = Pipeline::new(encoder, generator, store, template)
        .with_top_k(top_k.unwrap_or(config.top_k()))
        .with_history_pairs(config.history_pairs());

    if let Err(e) = pipeline.verify().await {
        eprintln!("Error: {}", e);
        return None;
    }
    Some(pipeline)
}

async fn run_chat(pipeline: &Pipeline<OllamaEncoder, OllamaClient>) {
    let stdin = std::io::stdin();
    let mut history: Vec<ConversationTurn> = Vec::new();

    loop {
        print!("you> ");
        std::io::stdout().flush().ok();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" {
            break;
        }
        match pipeline.answer(question, &history).await {
            Ok(answer) => {
                println!("verba> {}", answer);
                history.push(ConversationTurn::user(question));
                history.push(ConversationTurn::assistant(&answer));
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }
}
