//! Builds the corpus artifact: scan documents, chunk, embed, normalize, write.
//!
//! This runs offline, before the assistant serves queries. It uses the same
//! embedding model and max-normalization as query encoding, which is what
//! keeps query/corpus similarity scores comparable.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::corpus::{Chunk, CorpusError, EmbeddingStore};
use crate::encoder::max_normalize;
use crate::ollama::{OllamaClient, OllamaError};

/// Default maximum characters per chunk. Keeps chunks small enough for
/// embedding models.
pub const DEFAULT_MAX_CHARS: usize = 512;

/// A source document found under the docs root.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub body: String,
}

/// Scans `root` for `.md` and `.txt` files, skipping hidden entries.
/// Markdown YAML frontmatter is stripped from the body.
pub fn scan_documents(root: &Path) -> Result<Vec<Document>, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::NotADirectory(root.to_path_buf()));
    }
    let mut documents = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry.map_err(|e| IndexError::Walk(e.to_string()))?;
        let path = entry.path();
        let is_md = path.extension().is_some_and(|e| e == "md");
        let is_txt = path.extension().is_some_and(|e| e == "txt");
        if (is_md || is_txt) && path.is_file() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| IndexError::Read(path.to_path_buf(), e))?;
            let body = if is_md { strip_frontmatter(&raw) } else { raw };
            documents.push(Document {
                path: path.to_path_buf(),
                body,
            });
        }
    }
    Ok(documents)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Removes optional YAML frontmatter (between the first and second `---`).
fn strip_frontmatter(content: &str) -> String {
    let s = content.trim_start();
    let Some(after) = s.strip_prefix("---") else {
        return content.to_string();
    };
    match after.find("\n---") {
        Some(pos) => after[pos + 4..].trim_start().to_string(),
        None => content.to_string(),
    }
}

/// Splits a document body into chunk texts of at most `max_chars` bytes.
/// Paragraphs stay whole when they fit; overlong ones are cut at the last
/// space before the limit, or hard-cut when there is none. Cuts always land
/// on char boundaries, so multibyte text never splits mid-character.
pub fn chunk_text(body: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        let t = body.trim();
        return if t.is_empty() { Vec::new() } else { vec![t.to_string()] };
    }
    let mut chunks = Vec::new();
    for para in body.split("\n\n") {
        let mut rest = para.trim();
        while !rest.is_empty() {
            if rest.len() <= max_chars {
                chunks.push(rest.to_string());
                break;
            }
            let limit = floor_char_boundary(rest, max_chars + 1);
            let mut cut = rest[..limit]
                .rfind(' ')
                .unwrap_or_else(|| floor_char_boundary(rest, max_chars));
            if cut == 0 {
                // Single char wider than the budget; take it whole so the
                // loop always makes progress.
                cut = next_char_boundary(rest);
            }
            chunks.push(rest[..cut].trim_end().to_string());
            rest = rest[cut..].trim_start();
        }
    }
    chunks.retain(|c| !c.is_empty());
    chunks
}

/// Largest char boundary at or below `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Byte offset just past the first char. `s` must be non-empty.
fn next_char_boundary(s: &str) -> usize {
    s.char_indices().nth(1).map_or(s.len(), |(i, _)| i)
}

/// Full build: scan -> chunk -> embed -> max-normalize -> write artifact.
/// Chunk ids are assigned sequentially in scan order, which makes retrieval
/// tie-breaking stable across rebuilds of an unchanged docs tree.
pub async fn build_corpus(
    docs_root: &Path,
    artifact: &Path,
    client: &OllamaClient,
    max_chars: usize,
) -> Result<usize, IndexError> {
    let documents = scan_documents(docs_root)?;
    let texts: Vec<String> = documents
        .iter()
        .flat_map(|d| chunk_text(&d.body, max_chars))
        .collect();
    if texts.is_empty() {
        return Err(IndexError::NoContent(docs_root.to_path_buf()));
    }

    tracing::info!(documents = documents.len(), chunks = texts.len(), "embedding corpus");
    let embeddings = client.embed_batch(&texts).await?;
    if embeddings.len() != texts.len() {
        return Err(IndexError::EmbeddingCount {
            expected: texts.len(),
            found: embeddings.len(),
        });
    }

    let chunks: Vec<Chunk> = texts
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(i, (text, embedding))| Chunk {
            id: i as u64,
            text,
            embedding: max_normalize(&embedding),
        })
        .collect();

    // Validate through the same path queries will use before writing.
    let store = EmbeddingStore::from_chunks(chunks)?;
    EmbeddingStore::write_artifact(artifact, store.chunks())?;
    Ok(store.len())
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("walk error: {0}")]
    Walk(String),
    #[error("read error for {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("no chunkable content under {0}")]
    NoContent(PathBuf),
    #[error("embedding error: {0}")]
    Embed(#[from] OllamaError),
    #[error("got {found} embeddings for {expected} chunks")]
    EmbeddingCount { expected: usize, found: usize },
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_short_body_is_one_chunk() {
        let c = chunk_text("One paragraph.", 512);
        assert_eq!(c, vec!["One paragraph."]);
    }

    #[test]
    fn chunk_splits_on_blank_lines() {
        let c = chunk_text("P1\n\nP2\n\nP3", 512);
        assert_eq!(c, vec!["P1", "P2", "P3"]);
    }

    #[test]
    fn chunk_cuts_overlong_paragraph_at_spaces() {
        let body = "word ".repeat(100);
        let c = chunk_text(&body, 50);
        assert!(c.len() > 1);
        assert!(c.iter().all(|ch| ch.len() <= 50));
        assert!(c.iter().all(|ch| !ch.is_empty()));
    }

    #[test]
    fn chunk_hard_cuts_unbreakable_text() {
        let body = "x".repeat(120);
        let c = chunk_text(&body, 50);
        assert_eq!(c.len(), 3);
        assert!(c.iter().all(|ch| ch.len() <= 50));
    }

    #[test]
    fn chunk_empty_body_is_empty() {
        assert!(chunk_text("   \n\n  ", 512).is_empty());
    }

    #[test]
    fn chunk_cuts_multibyte_text_on_char_boundaries() {
        // Every char is 2 bytes; a 5-byte budget can never land mid-char.
        let body = "é".repeat(10);
        let c = chunk_text(&body, 5);
        assert_eq!(c.len(), 5);
        assert!(c.iter().all(|ch| ch.len() <= 5 && !ch.is_empty()));
        assert_eq!(c.concat(), body);
    }

    #[test]
    fn chunk_cuts_mixed_multibyte_paragraph_at_spaces() {
        let body = "naïve café menu ".repeat(20);
        let c = chunk_text(&body, 40);
        assert!(c.len() > 1);
        assert!(c.iter().all(|ch| ch.len() <= 40));
        assert!(c.iter().all(|ch| !ch.is_empty()));
    }

    #[test]
    fn chunk_takes_oversized_char_whole() {
        // 3-byte chars against a 1-byte budget: whole chars, one per chunk.
        let c = chunk_text("世界", 1);
        assert_eq!(c, vec!["世", "界"]);
    }

    #[test]
    fn strip_frontmatter_plain() {
        assert_eq!(strip_frontmatter("Hello."), "Hello.");
    }

    #[test]
    fn strip_frontmatter_with_yaml() {
        let s = "---\ntitle: Foo\n---\n\nActual content.";
        assert_eq!(strip_frontmatter(s), "Actual content.");
    }

    #[test]
    fn scan_rejects_missing_directory() {
        assert!(matches!(
            scan_documents(Path::new("/definitely/not/here")),
            Err(IndexError::NotADirectory(_))
        ));
    }
}
