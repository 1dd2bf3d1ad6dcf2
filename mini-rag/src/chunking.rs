//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], which
//! splits text into fixed-width, overlapping windows measured in characters.

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Splits a document into chunks.
pub trait Chunker: Send + Sync {
    /// Chunks of `document` in text order; none for empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Fixed-width character windows with overlap.
///
/// Windows start at offsets `0, step, 2·step, …` where `step = chunk_size - chunk_overlap`,
/// and chunking stops as soon as a window reaches the end of the text. The final
/// chunk may be shorter than `chunk_size`.
///
/// A chunk's id is `{document_id}_{chunk_index}`, and its metadata is the
/// document's plus `chunk_index`.
///
/// # Example
///
/// ```rust
/// use mini_rag::{Chunker, Document, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(10, 5)?;
/// let chunks = chunker.chunk(&Document::new("doc", "0123456789abcdefghij"));
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[1].text, "56789abcde");
/// # Ok::<(), mini_rag::RagError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Windows of `chunk_size` characters, each starting `chunk_size - chunk_overlap`
    /// after the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size` (the window would never advance).
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::invalid("chunk_size must be greater than zero"));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::invalid(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Distance between the start offsets of consecutive chunks.
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Compute the `(start, end)` character windows for a text of `len` characters.
    pub fn windows(&self, len: usize) -> Vec<(usize, usize)> {
        let mut windows = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            windows.push((start, end));
            if end == len {
                break;
            }
            start += self.step();
        }
        windows
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        // Byte position of every char boundary, plus the end of the string,
        // so character windows can be sliced without splitting a code point.
        let boundaries: Vec<usize> = document
            .text
            .char_indices()
            .map(|(pos, _)| pos)
            .chain(std::iter::once(document.text.len()))
            .collect();
        let char_len = boundaries.len() - 1;

        self.windows(char_len)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), chunk_index.to_string());
                Chunk {
                    id: format!("{}_{chunk_index}", document.id),
                    text: document.text[boundaries[start]..boundaries[end]].to_string(),
                    document_id: document.id.clone(),
                    chunk_index,
                    start_offset: start,
                    end_offset: end,
                    metadata,
                }
            })
            .collect()
    }
}
