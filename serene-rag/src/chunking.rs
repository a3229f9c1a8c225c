//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: fixed character windows with a constant overlap
//! - [`RecursiveChunker`]: splits by paragraphs, lines, sentences, then words
//!
//! Sizes are measured in characters (Unicode scalar values), never bytes, so
//! multi-byte text is never split inside a character.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::{ChunkingStrategy, RagConfig};
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks, left to right.
    ///
    /// Returns an empty `Vec` if the document has empty text. Never returns
    /// an empty chunk.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Build the chunker selected by `config`.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if the size/overlap pair is invalid.
pub fn chunker_for(config: &RagConfig) -> Result<Arc<dyn Chunker>> {
    Ok(match config.chunking {
        ChunkingStrategy::Fixed => {
            Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
        ChunkingStrategy::Recursive => {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
    })
}

fn validate(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

fn make_chunk(document: &Document, index: usize, start: usize, text: String) -> Chunk {
    Chunk {
        id: format!("{}_{index}", document.id),
        text,
        document_id: document.id.clone(),
        index,
        start,
    }
}

/// Byte offset of every character boundary in `text`, including `text.len()`.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Windows of `chunk_size` characters whose starts advance by
/// `chunk_size - chunk_overlap`. Stops at the first window reaching the end
/// of the text, so no window is wholly contained in its predecessor.
fn fixed_windows(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, String)> {
    if text.is_empty() {
        return Vec::new();
    }

    let boundaries = char_boundaries(text);
    let total = boundaries.len() - 1;
    let step = chunk_size - chunk_overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(total);
        windows.push((start, text[boundaries[start]..boundaries[end]].to_string()));
        if end == total {
            break;
        }
        start += step;
    }

    windows
}

/// Splits text into fixed-size chunks by character count with a fixed overlap.
///
/// A document of `L` characters yields `ceil((L - O) / (C - O))` chunks, or
/// exactly one when `L <= C`. Chunk IDs are `{document_id}_{chunk_index}`.
///
/// # Example
///
/// ```rust,ignore
/// use serene_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        fixed_windows(&document.text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(index, (start, text))| make_chunk(document, index, start, text))
            .collect()
    }
}

/// Splits text hierarchically: paragraphs → lines → sentences → words.
///
/// Pieces are merged greedily up to `chunk_size` characters. When a chunk is
/// emitted, trailing pieces totalling at most `chunk_overlap` characters are
/// carried into the next one. A single word longer than `chunk_size` falls
/// back to fixed windows. Chunks are whitespace-trimmed.
///
/// # Example
///
/// ```rust,ignore
/// use serene_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Break `text` into pieces of at most `chunk_size` characters, using the
    /// coarsest separator that works.
    fn pieces(&self, text: &str, separators: &[&str], out: &mut Vec<String>) {
        if char_len(text) <= self.chunk_size {
            out.push(text.to_string());
            return;
        }

        let Some((separator, rest)) = separators.split_first() else {
            out.extend(
                fixed_windows(text, self.chunk_size, self.chunk_overlap)
                    .into_iter()
                    .map(|(_, window)| window),
            );
            return;
        };

        for segment in split_keeping_separator(text, separator) {
            self.pieces(segment, rest, out);
        }
    }

    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut merged = Vec::new();
        let mut window: VecDeque<(String, usize)> = VecDeque::new();
        let mut window_len = 0;

        for piece in pieces {
            let piece_len = char_len(&piece);
            if window_len + piece_len > self.chunk_size && !window.is_empty() {
                merged.push(window.iter().map(|(p, _)| p.as_str()).collect::<String>());
                while window_len > self.chunk_overlap
                    || (window_len + piece_len > self.chunk_size && !window.is_empty())
                {
                    match window.pop_front() {
                        Some((_, len)) => window_len -= len,
                        None => break,
                    }
                }
            }
            window_len += piece_len;
            window.push_back((piece, piece_len));
        }

        if !window.is_empty() {
            merged.push(window.iter().map(|(p, _)| p.as_str()).collect::<String>());
        }

        merged
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.pieces(text, &SEPARATORS, &mut pieces);

        let mut chunks = Vec::new();
        let mut search_from = 0;
        for merged in self.merge(pieces) {
            let trimmed = merged.trim();
            if trimmed.is_empty() {
                continue;
            }
            let byte_start = text[search_from..]
                .find(trimmed)
                .map(|pos| search_from + pos)
                .unwrap_or(search_from);
            let start = text[..byte_start].chars().count();
            // Overlapping chunks may begin anywhere after the previous start.
            search_from = text[byte_start..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| byte_start + i)
                .unwrap_or(text.len());
            chunks.push(make_chunk(document, chunks.len(), start, trimmed.to_string()));
        }

        chunks
    }
}
