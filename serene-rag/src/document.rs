//! Data types for documents, chunks, and search results.

use serde::{Deserialize, Serialize};

/// A source document loaded at startup.
///
/// Documents are never mutated after loading and are only held in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Identifier used as the prefix of chunk IDs.
    pub id: String,
    /// The full text of the document.
    pub text: String,
    /// Where the document came from, usually a file path.
    pub source: String,
}

impl Document {
    /// Create a document whose source is the same as its ID.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        Self { source: id.clone(), id, text: text.into() }
    }
}

/// A contiguous segment of a [`Document`], the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// `{document_id}_{index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of this chunk within its document.
    pub index: usize,
    /// Character offset of the chunk's first character in the parent text.
    pub start: usize,
}

impl Chunk {
    /// A standalone chunk, not derived from a loaded document.
    ///
    /// Useful for seeding an index directly.
    pub fn from_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        Self { document_id: id.clone(), id, text: text.into(), index: 0, start: 0 }
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A retrieved [`Chunk`] paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity (higher is more relevant).
    pub score: f32,
}
