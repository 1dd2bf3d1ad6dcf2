//! Chunk selection on top of the [`FlatIndex`].
//!
//! The [`Retriever`] supports two strategies:
//!
//! - [`SearchStrategy::TopK`]: the `k` nearest entries, nearest first.
//! - [`SearchStrategy::Mmr`]: maximal marginal relevance over the `fetch_k`
//!   nearest entries:
//!   `λ × sim(query, doc) − (1 − λ) × max sim(doc, already selected)`.
//!
//! Selection is lazy: [`Retrieval`] is an iterator and MMR only scores the
//! candidate pool one pick at a time as it is consumed.

use std::sync::Arc;

use crate::config::{RagConfig, SearchStrategy};
use crate::document::SearchResult;
use crate::error::{RagError, Result};
use crate::index::{FlatIndex, IndexEntry, Neighbor};

/// Retrieval parameters, usually taken from a [`RagConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrieverOptions {
    /// Selection strategy.
    pub strategy: SearchStrategy,
    /// Number of chunks to return.
    pub k: usize,
    /// Candidate pool size (MMR, or when skipping adjacent chunks).
    pub fetch_k: usize,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure diversity.
    pub lambda: f32,
    /// Skip candidates adjacent to an already returned chunk of the same document.
    pub dedup_adjacent: bool,
}

impl From<&RagConfig> for RetrieverOptions {
    fn from(config: &RagConfig) -> Self {
        Self {
            strategy: config.search,
            k: config.top_k,
            fetch_k: config.fetch_k,
            lambda: config.mmr_lambda,
            dedup_adjacent: config.dedup_adjacent,
        }
    }
}

/// Selects relevant chunks from a shared, read-only index.
#[derive(Debug, Clone)]
pub struct Retriever {
    index: Arc<FlatIndex>,
    options: RetrieverOptions,
}

impl Retriever {
    /// Wrap `index` with the given options.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `k == 0`, `fetch_k < k`
    /// or `lambda` is outside `[0, 1]`.
    pub fn new(index: Arc<FlatIndex>, options: RetrieverOptions) -> Result<Self> {
        check_pool(options.k, options.fetch_k)?;
        if !(0.0..=1.0).contains(&options.lambda) {
            return Err(RagError::invalid(format!("lambda ({}) must be within [0, 1]", options.lambda)));
        }
        Ok(Self { index, options })
    }

    /// The underlying index.
    pub fn index(&self) -> &Arc<FlatIndex> {
        &self.index
    }

    /// The active options.
    pub fn options(&self) -> &RetrieverOptions {
        &self.options
    }

    /// Start retrieving chunks for `query` with the configured `k` and `fetch_k`.
    ///
    /// # Errors
    ///
    /// Fails with the same errors as [`FlatIndex::search`].
    pub fn retrieve<'a>(&'a self, query: &'a [f32]) -> Result<Retrieval<'a>> {
        self.retrieve_with(query, self.options.k, self.options.fetch_k)
    }

    /// Like [`retrieve`](Self::retrieve) with a per-call `k` and candidate pool size.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `k == 0` or `fetch_k < k`,
    /// otherwise the errors of [`FlatIndex::search`].
    pub fn retrieve_with<'a>(&'a self, query: &'a [f32], k: usize, fetch_k: usize) -> Result<Retrieval<'a>> {
        check_pool(k, fetch_k)?;
        let RetrieverOptions { strategy, lambda, dedup_adjacent, .. } = self.options;
        // Skipping neighbours needs spare candidates to refill from.
        let pool = if strategy == SearchStrategy::Mmr || dedup_adjacent { fetch_k } else { k };
        let candidates = self.index.search(query, pool)?;

        let selection = match strategy {
            SearchStrategy::TopK => Selection::Ranked(candidates.into_iter()),
            SearchStrategy::Mmr => Selection::Mmr(MmrSelection::new(&self.index, query, candidates, lambda)),
        };

        Ok(Retrieval { index: &self.index, selection, remaining: k, dedup_adjacent, returned: Vec::new() })
    }

    /// Retrieve and collect into a ranked list.
    ///
    /// # Errors
    ///
    /// Fails with the same errors as [`FlatIndex::search`].
    pub fn retrieve_all(&self, query: &[f32]) -> Result<Vec<SearchResult>> {
        Ok(self.retrieve(query)?.collect())
    }
}

fn check_pool(k: usize, fetch_k: usize) -> Result<()> {
    if k == 0 {
        return Err(RagError::invalid("k must be greater than zero"));
    }
    if fetch_k < k {
        return Err(RagError::invalid(format!("fetch_k ({fetch_k}) must be at least k ({k})")));
    }
    Ok(())
}

/// A lazy sequence of retrieved chunks, most relevant first, at most `k` long.
pub struct Retrieval<'a> {
    index: &'a FlatIndex,
    selection: Selection<'a>,
    remaining: usize,
    dedup_adjacent: bool,
    returned: Vec<(&'a str, usize)>,
}

enum Selection<'a> {
    Ranked(std::vec::IntoIter<Neighbor>),
    Mmr(MmrSelection<'a>),
}

impl Iterator for Selection<'_> {
    type Item = Neighbor;

    fn next(&mut self) -> Option<Neighbor> {
        match self {
            Self::Ranked(iter) => iter.next(),
            Self::Mmr(mmr) => mmr.next(),
        }
    }
}

impl<'a> Retrieval<'a> {
    fn is_adjacent_to_returned(&self, entry: &IndexEntry) -> bool {
        self.returned.iter().any(|(document_id, chunk_index)| {
            *document_id == entry.chunk.document_id && chunk_index.abs_diff(entry.chunk.chunk_index) == 1
        })
    }
}

impl<'a> Iterator for Retrieval<'a> {
    type Item = SearchResult;

    fn next(&mut self) -> Option<SearchResult> {
        if self.remaining == 0 {
            return None;
        }
        let index: &'a FlatIndex = self.index;
        loop {
            let neighbor = self.selection.next()?;
            let entry = index.entry(neighbor.entry_id)?;
            if self.dedup_adjacent {
                if self.is_adjacent_to_returned(entry) {
                    continue;
                }
                self.returned.push((entry.chunk.document_id.as_str(), entry.chunk.chunk_index));
            }
            self.remaining -= 1;
            return Some(SearchResult::new(entry.chunk.clone(), entry.id, neighbor.distance));
        }
    }
}

/// Greedy maximal-marginal-relevance selection over a fixed candidate pool.
///
/// Relevance and redundancy are both measured with cosine similarity. The
/// first pick is the candidate most similar to the query.
struct MmrSelection<'a> {
    query: &'a [f32],
    lambda: f32,
    remaining: Vec<(Neighbor, &'a [f32])>,
    selected: Vec<&'a [f32]>,
}

impl<'a> MmrSelection<'a> {
    fn new(index: &'a FlatIndex, query: &'a [f32], candidates: Vec<Neighbor>, lambda: f32) -> Self {
        let remaining = candidates
            .into_iter()
            .filter_map(|n| index.entry(n.entry_id).map(|e| (n, e.embedding.as_slice())))
            .collect();
        Self { query, lambda, remaining, selected: Vec::new() }
    }

    fn score(&self, embedding: &[f32]) -> f32 {
        let relevance = cosine_similarity(self.query, embedding);
        if self.selected.is_empty() {
            return relevance;
        }
        let redundancy = self
            .selected
            .iter()
            .map(|chosen| cosine_similarity(chosen, embedding))
            .fold(f32::NEG_INFINITY, f32::max);
        self.lambda * relevance - (1.0 - self.lambda) * redundancy
    }
}

impl Iterator for MmrSelection<'_> {
    type Item = Neighbor;

    fn next(&mut self) -> Option<Neighbor> {
        // Strict comparison keeps the nearest candidate on ties.
        let mut best: Option<(usize, f32)> = None;
        for (pos, (_, embedding)) in self.remaining.iter().enumerate() {
            let score = self.score(embedding);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((pos, score));
            }
        }
        let (pos, _) = best?;
        let (neighbor, embedding) = self.remaining.remove(pos);
        self.selected.push(embedding);
        Some(neighbor)
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::Chunk;

    fn chunk(document_id: &str, i: usize) -> Chunk {
        Chunk {
            id: format!("{document_id}_{i}"),
            text: format!("{document_id} chunk {i}"),
            document_id: document_id.into(),
            chunk_index: i,
            start_offset: i * 10,
            end_offset: i * 10 + 10,
            metadata: HashMap::new(),
        }
    }

    fn index(vectors: Vec<Vec<f32>>) -> Arc<FlatIndex> {
        Arc::new(
            FlatIndex::build(vectors.into_iter().enumerate().map(|(i, v)| (chunk("doc", i), v)))
                .unwrap(),
        )
    }

    fn options(strategy: SearchStrategy, k: usize, fetch_k: usize, lambda: f32) -> RetrieverOptions {
        RetrieverOptions { strategy, k, fetch_k, lambda, dedup_adjacent: false }
    }

    fn ids(results: &[SearchResult]) -> Vec<usize> {
        results.iter().map(|r| r.entry_id).collect()
    }

    #[test]
    fn top_k_returns_nearest_in_order() {
        let index = index(vec![vec![0.0, 3.0], vec![0.0, 1.0], vec![0.0, 2.0]]);
        let retriever = Retriever::new(index, options(SearchStrategy::TopK, 2, 2, 0.5)).unwrap();
        let results = retriever.retrieve_all(&[0.0, 0.0]).unwrap();
        assert_eq!(ids(&results), [1, 2]);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn mmr_prefers_diverse_candidates() {
        // Two near-duplicates along x, one distinct direction along y.
        let index = index(vec![vec![1.0, 0.0], vec![0.99, 0.01], vec![0.6, 0.8]]);
        let query = [0.9, 0.3];

        let top_k = Retriever::new(Arc::clone(&index), options(SearchStrategy::TopK, 2, 3, 0.5)).unwrap();
        assert_eq!(ids(&top_k.retrieve_all(&query).unwrap()), [1, 0]);

        let mmr = Retriever::new(index, options(SearchStrategy::Mmr, 2, 3, 0.5)).unwrap();
        let picked = ids(&mmr.retrieve_all(&query).unwrap());
        assert_eq!(picked.len(), 2);
        assert!(picked.contains(&2), "expected the distinct candidate, got {picked:?}");
    }

    #[test]
    fn mmr_with_lambda_one_matches_relevance_order() {
        let index = index(vec![vec![1.0, 0.0], vec![0.99, 0.01], vec![0.6, 0.8]]);
        let mmr = Retriever::new(index, options(SearchStrategy::Mmr, 3, 3, 1.0)).unwrap();
        // Ranked by cosine similarity to the query.
        assert_eq!(ids(&mmr.retrieve_all(&[1.0, 0.0]).unwrap()), [0, 1, 2]);
    }

    #[test]
    fn mmr_draws_only_from_fetch_k_nearest() {
        let vectors: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32, 1.0]).collect();
        let index = index(vectors);
        let retriever = Retriever::new(Arc::clone(&index), options(SearchStrategy::Mmr, 3, 5, 0.3)).unwrap();
        let nearest: Vec<usize> = index.search(&[0.0, 1.0], 5).unwrap().iter().map(|n| n.entry_id).collect();

        let results = retriever.retrieve_all(&[0.0, 1.0]).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| nearest.contains(&r.entry_id)));
    }

    #[test]
    fn retrieval_is_lazy_and_bounded() {
        let index = index(vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]]);
        let retriever = Retriever::new(index, options(SearchStrategy::Mmr, 3, 4, 0.5)).unwrap();
        let mut retrieval = retriever.retrieve(&[0.0]).unwrap();
        assert!(retrieval.next().is_some());
        assert_eq!(retrieval.count(), 2);
    }

    #[test]
    fn dedup_adjacent_skips_neighbouring_chunks() {
        let index = index(vec![vec![0.0], vec![0.1], vec![0.2], vec![5.0]]);
        let mut opts = options(SearchStrategy::TopK, 2, 4, 0.5);
        opts.dedup_adjacent = true;
        let retriever = Retriever::new(index, opts).unwrap();
        // Entry 1 is chunk 1 of the same document as entry 0, so it is skipped.
        assert_eq!(ids(&retriever.retrieve_all(&[0.0]).unwrap()), [0, 2]);
    }

    #[test]
    fn search_errors_propagate() {
        let empty = Arc::new(FlatIndex::build(Vec::new()).unwrap());
        let retriever = Retriever::new(empty, options(SearchStrategy::Mmr, 1, 1, 0.5)).unwrap();
        assert!(matches!(retriever.retrieve(&[1.0]), Err(RagError::EmptyIndex)));

        let retriever = Retriever::new(index(vec![vec![1.0, 0.0]]), options(SearchStrategy::TopK, 1, 1, 0.5)).unwrap();
        assert!(matches!(retriever.retrieve(&[1.0]), Err(RagError::DimensionMismatch { .. })));
    }

    #[test]
    fn per_call_k_overrides_options() {
        let index = index((0..6).map(|i| vec![i as f32]).collect());
        let retriever = Retriever::new(index, options(SearchStrategy::TopK, 1, 1, 0.5)).unwrap();
        let results: Vec<SearchResult> = retriever.retrieve_with(&[0.0], 3, 5).unwrap().collect();
        assert_eq!(ids(&results), [0, 1, 2]);
        assert!(retriever.retrieve_with(&[0.0], 0, 5).is_err());
        assert!(retriever.retrieve_with(&[0.0], 3, 2).is_err());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let idx = index(vec![vec![1.0]]);
        assert!(Retriever::new(Arc::clone(&idx), options(SearchStrategy::Mmr, 0, 1, 0.5)).is_err());
        assert!(Retriever::new(Arc::clone(&idx), options(SearchStrategy::Mmr, 3, 2, 0.5)).is_err());
        assert!(Retriever::new(idx, options(SearchStrategy::Mmr, 1, 1, 2.0)).is_err());
    }
}
