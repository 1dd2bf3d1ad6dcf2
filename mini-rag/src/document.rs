//! The values that flow through the pipeline: documents in, chunks indexed,
//! search results out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One loaded source file (or any caller-supplied text).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Identifier, used as the prefix of every chunk id. The loader uses the path.
    pub id: String,
    /// Full text.
    pub text: String,
    /// Free-form attributes copied onto every chunk (the loader sets `format`).
    pub metadata: HashMap<String, String>,
    /// Where the text came from, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }
}

/// A contiguous window of a [`Document`]'s text.
///
/// Offsets count characters, not bytes: `start_offset < end_offset <= text.chars().count()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk (`{document_id}_{chunk_index}`).
    pub id: String,
    /// The characters `start_offset..end_offset` of the document text.
    pub text: String,
    /// [`Document::id`] of the source.
    pub document_id: String,
    /// Position of this chunk within its document.
    pub chunk_index: usize,
    /// Character offset where the chunk starts.
    pub start_offset: usize,
    /// Character offset one past the chunk's last character.
    pub end_offset: usize,
    /// The document's metadata plus `chunk_index`.
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Number of characters covered by the chunk.
    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    /// Chunks are never empty; provided for API symmetry with [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A retrieved [`Chunk`] paired with its distance to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The chunk's stable identifier inside the vector index.
    pub entry_id: usize,
    /// Euclidean distance to the query vector.
    pub distance: f32,
    /// Relevance derived from the distance, `1 / (1 + distance)` (higher is more relevant).
    pub score: f32,
}

impl SearchResult {
    pub(crate) fn new(chunk: Chunk, entry_id: usize, distance: f32) -> Self {
        Self { chunk, entry_id, distance, score: 1.0 / (1.0 + distance) }
    }
}
