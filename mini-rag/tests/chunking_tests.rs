//! Property tests for fixed-size chunking.

use mini_rag::{Chunk, Chunker, Document, FixedSizeChunker};
use proptest::prelude::*;

/// Rebuild the source text by dropping each chunk's overlap with its predecessor.
fn reconstruct(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered = 0;
    for chunk in chunks {
        let skip = covered - chunk.start_offset;
        text.extend(chunk.text.chars().skip(skip));
        covered = chunk.end_offset;
    }
    text
}

/// Chunk size and an overlap strictly below it.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..40).prop_flat_map(|size| (Just(size), 0..size))
}

/// **Chunks tile the text**
/// *For any* non-empty text and valid sizes, removing the overlap between
/// consecutive chunks and concatenating them reproduces the text exactly.
mod prop_reconstruction {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn deoverlapped_chunks_reconstruct_text(
            text in "[a-zé检 \n]{1,200}",
            (size, overlap) in arb_sizes(),
        ) {
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));
            prop_assert_eq!(reconstruct(&chunks), text);
        }

        #[test]
        fn offsets_are_in_bounds_and_overlap_by_config(
            text in "[a-z]{1,200}",
            (size, overlap) in arb_sizes(),
        ) {
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));
            let len = text.chars().count();

            for chunk in &chunks {
                prop_assert!(chunk.start_offset < chunk.end_offset);
                prop_assert!(chunk.end_offset <= len);
                prop_assert!(chunk.len() <= size);
                prop_assert_eq!(chunk.text.chars().count(), chunk.len());
            }
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[0].end_offset - pair[1].start_offset, overlap);
            }
            prop_assert_eq!(chunks.last().unwrap().end_offset, len);
        }
    }
}

/// **Chunk count**
/// *For any* non-empty text of `len` characters, the number of chunks is
/// `ceil((len - overlap) / (size - overlap))` when `len > overlap`, else 1.
mod prop_chunk_count {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn count_matches_formula(len in 1usize..500, (size, overlap) in arb_sizes()) {
            let text = "x".repeat(len);
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc", text));

            let expected = if len > overlap {
                (len - overlap).div_ceil(size - overlap)
            } else {
                1
            };
            prop_assert_eq!(chunks.len(), expected);
        }
    }
}

#[test]
fn chunk_size_300_overlap_50_on_300_chars_is_a_single_chunk() {
    let text: String = "abcdefghij".repeat(30);
    let chunks = FixedSizeChunker::new(300, 50).unwrap().chunk(&Document::new("docs.txt", text.clone()));
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);
    assert_eq!((chunks[0].start_offset, chunks[0].end_offset), (0, 300));
}
