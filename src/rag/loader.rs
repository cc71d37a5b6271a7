//! Document loader: turns a directory of uploaded files into a
//! [`ChunkStore`].
//!
//! A collaborator of the engine rather than part of its core contract: the
//! index only assumes chunks arrive with unique ids and non-empty text.
//! Plain-text-like files are read directly, JSON files contribute their
//! string values, and anything else is skipped with a log line. Files are
//! visited in name order so repeated loads of the same directory produce
//! the same chunk ids.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::chunk::{Chunk, ChunkStore};
use crate::core::errors::RagError;

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Load every supported document under `dir` into chunks.
pub fn load_all_documents(dir: &Path, config: &LoaderConfig) -> Result<ChunkStore, RagError> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut chunks = Vec::new();
    let mut next_id = 0u64;

    for entry in entries {
        let path = entry.path();
        let source = entry.file_name().to_string_lossy().to_string();

        let Some(text) = read_document(&path) else {
            continue;
        };
        if text.trim().is_empty() {
            tracing::debug!(source, "skipping empty document");
            continue;
        }

        let pieces = split_into_chunks(&text, config);
        tracing::info!(source, pieces = pieces.len(), "document loaded");

        for (sequence_no, piece) in pieces.into_iter().enumerate() {
            chunks.push(Chunk {
                id: next_id,
                text: piece,
                source_path: source.clone(),
                sequence_no: sequence_no as u32,
            });
            next_id += 1;
        }
    }

    Ok(ChunkStore::from_chunks(chunks))
}

fn read_document(path: &Path) -> Option<String> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "md" => match fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to read document: {err}");
                None
            }
        },
        "json" => match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    let mut strings = Vec::new();
                    collect_strings(&value, &mut strings);
                    Some(strings.join("\n"))
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), "failed to parse JSON: {err}");
                    None
                }
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to read document: {err}");
                None
            }
        },
        _ => {
            tracing::debug!(path = %path.display(), "unsupported document type, skipping");
            None
        }
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if !s.trim().is_empty() {
                out.push(s.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

/// Split text into overlapping character windows, preferring to end each
/// window at a sentence boundary.
fn split_into_chunks(text: &str, config: &LoaderConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total == 0 {
        return Vec::new();
    }

    let chunk_size = config.chunk_size.max(1);
    let step = chunk_size.saturating_sub(config.chunk_overlap).max(1);

    let mut pieces = Vec::new();
    let mut start = 0;

    while start < total {
        let end = (start + chunk_size).min(total);
        let window: String = chars[start..end].iter().collect();

        let piece = if end < total {
            cut_at_sentence_boundary(&window)
        } else {
            window
        };

        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed.to_string());
        }

        start += step;
    }

    pieces
}

/// Cut the window at the last sentence ending in its final fifth, if any.
fn cut_at_sentence_boundary(window: &str) -> String {
    const ENDINGS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let mut search_start = (window.len() * 4) / 5;
    while search_start > 0 && !window.is_char_boundary(search_start) {
        search_start -= 1;
    }

    let tail = &window[search_start..];
    let best = ENDINGS
        .iter()
        .filter_map(|ending| tail.rfind(ending).map(|pos| pos + ending.len()))
        .max();

    match best {
        Some(cut) => window[..search_start + cut].to_string(),
        None => window.to_string(),
    }
}
