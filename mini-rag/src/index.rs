//! Exact nearest-neighbour index over chunk embeddings.
//!
//! [`FlatIndex`] is built once from every `(Chunk, embedding)` pair and is
//! read-only afterwards, so a single instance can be shared behind an `Arc`
//! and searched concurrently without locking. Search is a brute-force scan
//! ranked by Euclidean distance.

use crate::document::Chunk;
use crate::error::{RagError, Result};

/// A chunk paired with its embedding and its position in insertion order.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Stable identifier: the entry's position in the build input.
    pub id: usize,
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The chunk's embedding.
    pub embedding: Vec<f32>,
}

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// The matching [`IndexEntry::id`].
    pub entry_id: usize,
    /// Euclidean distance between the entry and the query.
    pub distance: f32,
}

/// An immutable, exhaustively searched L2 index.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    entries: Vec<IndexEntry>,
    dimensions: Option<usize>,
}

impl FlatIndex {
    /// Build an index from all entries at once.
    ///
    /// The first vector fixes the index dimension; an empty input builds an
    /// empty index that rejects every search with [`RagError::EmptyIndex`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if any vector differs in length
    /// from the first one.
    pub fn build(entries: impl IntoIterator<Item = (Chunk, Vec<f32>)>) -> Result<Self> {
        let mut index = Self::default();
        for (id, (chunk, embedding)) in entries.into_iter().enumerate() {
            let expected = *index.dimensions.get_or_insert(embedding.len());
            if embedding.len() != expected {
                return Err(RagError::DimensionMismatch { expected, actual: embedding.len() });
            }
            index.entries.push(IndexEntry { id, chunk, embedding });
        }
        Ok(index)
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The shared vector dimension, `None` for an empty index.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Look up an entry by id.
    pub fn entry(&self, id: usize) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Return the `min(k, len)` entries nearest to `query`, by increasing distance.
    ///
    /// Ties are broken by entry id so results are deterministic.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfiguration`] if `k == 0`
    /// - [`RagError::EmptyIndex`] if the index has no entries
    /// - [`RagError::DimensionMismatch`] if `query` has the wrong length
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(RagError::invalid("k must be greater than zero"));
        }
        let Some(expected) = self.dimensions else {
            return Err(RagError::EmptyIndex);
        };
        if query.len() != expected {
            return Err(RagError::DimensionMismatch { expected, actual: query.len() });
        }

        let mut neighbors: Vec<Neighbor> = self
            .entries
            .iter()
            .map(|entry| Neighbor { entry_id: entry.id, distance: l2_distance(&entry.embedding, query) })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance.total_cmp(&b.distance).then_with(|| a.entry_id.cmp(&b.entry_id))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }
}

/// Euclidean distance between two equal-length vectors.
pub(crate) fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
}
