// Chunk splitter module
// Splits documents into overlapping character windows for embedding


use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::loader::Document;
use crate::metadata::DocMetadata;
use crate::{KbError, Result};

/// A bounded slice of a document's text, carrying the parent's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocMetadata,
    /// Index of this chunk within its parent document
    pub chunk_index: usize,
}

/// Configuration for the character-window splitter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Split documents into chunks of at most `chunk_size` characters.
///
/// Consecutive chunks from the same document share exactly `chunk_overlap`
/// characters relative to the chosen cut point. Cut points prefer the last
/// blank-line boundary inside the window, falling back to a hard cut when no
/// boundary lies past the overlap region. Counts are Unicode scalar values,
/// never bytes, so multi-byte text is never split mid-character.
#[inline]
pub fn split(documents: &[Document], config: &SplitterConfig) -> Result<Vec<Chunk>> {
    if config.chunk_overlap >= config.chunk_size {
        return Err(KbError::Configuration(format!(
            "Chunk overlap ({}) must be smaller than chunk size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    let mut chunks = Vec::new();
    for document in documents {
        split_document(document, config, &mut chunks);
    }

    debug!(
        "Split {} documents into {} chunks",
        documents.len(),
        chunks.len()
    );
    Ok(chunks)
}

/// Split one document, appending its chunks in order
fn split_document(document: &Document, config: &SplitterConfig, chunks: &mut Vec<Chunk>) {
    if document.content.trim().is_empty() {
        return;
    }

    let chars: Vec<char> = document.content.chars().collect();
    let mut start = 0;
    let mut chunk_index = 0;

    loop {
        let window_end = (start + config.chunk_size).min(chars.len());
        let cut = if window_end == chars.len() {
            window_end
        } else {
            find_cut(&chars, start + config.chunk_overlap, window_end)
        };

        chunks.push(Chunk {
            content: chars[start..cut].iter().collect(),
            metadata: document.metadata.clone(),
            chunk_index,
        });
        chunk_index += 1;

        if cut == chars.len() {
            break;
        }
        // Progress is guaranteed: cut > start + overlap
        start = cut - config.chunk_overlap;
    }
}

/// Choose the cut point for a window that does not reach the end of the text.
///
/// Prefers cutting just after the last blank line whose end lies past
/// `min_cut`; otherwise hard-cuts at `window_end`.
fn find_cut(chars: &[char], min_cut: usize, window_end: usize) -> usize {
    for pos in (0..window_end.saturating_sub(1)).rev() {
        if chars[pos] == '\n' && chars[pos + 1] == '\n' {
            let cut = pos + 2;
            if cut > min_cut {
                return cut;
            }
            // Boundaries below this one are even earlier
            break;
        }
    }

    window_end
}
