//! Deterministic, dependency-free embeddings based on feature hashing.
//!
//! Text is split into tokens and every token is hashed (FNV-1a) into one of
//! `dimensions` buckets; the resulting bag-of-tokens vector is L2-normalised.
//! Texts that share tokens end up close together, which is enough for offline
//! runs, demos and tests.
//!
//! Alphabetic scripts tokenise into lowercase words. CJK text has no word
//! separators, so runs of ideographs (and kana or hangul) become overlapping
//! character bigrams instead: `检索增强` yields `检索`, `索增`, `增强`.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// An [`EmbeddingProvider`] that maps text to hashed word counts.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimensions` entries.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let bucket = (fnv1a(&token) % self.dimensions as u64) as usize;
            embedding[bucket] += 1.0;
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Lowercase words for alphabetic scripts, character bigrams for CJK runs.
fn tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let chars: Vec<char> = word.chars().collect();
        let mut start = 0;
        while start < chars.len() {
            let cjk = is_cjk(chars[start]);
            let end = chars[start..]
                .iter()
                .position(|&c| is_cjk(c) != cjk)
                .map_or(chars.len(), |len| start + len);
            let run = &chars[start..end];
            if !cjk {
                tokens.push(run.iter().collect::<String>().to_lowercase());
            } else if run.len() == 1 {
                tokens.push(run[0].to_string());
            } else {
                tokens.extend(run.windows(2).map(|pair| pair.iter().collect::<String>()));
            }
            start = end;
        }
    }
    tokens
}

fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{3040}'..='\u{30ff}'       // hiragana, katakana
            | '\u{3400}'..='\u{4dbf}' // CJK extension A
            | '\u{4e00}'..='\u{9fff}' // CJK unified ideographs
            | '\u{ac00}'..='\u{d7af}' // hangul syllables
            | '\u{f900}'..='\u{faff}' // compatibility ideographs
            | '\u{20000}'..='\u{2fa1f}'
    )
}

fn fnv1a(word: &str) -> u64 {
    word.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.dimensions == 0 {
            return Err(RagError::Embedding {
                provider: self.name().into(),
                message: "dimensions must be greater than zero".into(),
            });
        }
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_same_vector() {
        let embedder = HashingEmbedder::new(32);
        let a = embedder.embed("Retrieval augmented generation").await.unwrap();
        let b = embedder.embed("retrieval, AUGMENTED generation!").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.embed("the quick brown fox").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn text_without_words_is_the_zero_vector() {
        let v = HashingEmbedder::new(8).embed("  ?! ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let embedder = HashingEmbedder::new(16);
        let batch = embedder.embed_batch(&["alpha", "beta"]).await.unwrap();
        assert_eq!(batch[0], embedder.embed("alpha").await.unwrap());
        assert_eq!(batch[1], embedder.embed("beta").await.unwrap());
    }

    #[test]
    fn cjk_runs_become_bigrams_next_to_latin_words() {
        assert_eq!(tokens("RAG是检索增强"), vec!["rag", "是检", "检索", "索增", "增强"]);
        assert_eq!(tokens("Hello, 世界! 好"), vec!["hello", "世界", "好"]);
        assert_eq!(tokens("Café au lait"), vec!["café", "au", "lait"]);
    }

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn chinese_question_prefers_the_matching_sentence() {
        let embedder = HashingEmbedder::default();
        let docs = ["人工智能是一门研究智能行为的科学。", "RAG是检索增强生成的简称。", "巴黎是法国的首都。"];
        let doc_vectors = embedder.embed_batch(&docs).await.unwrap();

        for (question, expected) in [("什么是检索增强生成", 1), ("法国的首都是哪里", 2)] {
            let query = embedder.embed(question).await.unwrap();
            let best = (0..docs.len())
                .max_by(|&a, &b| dot(&query, &doc_vectors[a]).total_cmp(&dot(&query, &doc_vectors[b])))
                .unwrap();
            assert_eq!(best, expected, "{question}");
            assert!(dot(&query, &doc_vectors[expected]) > 0.3, "{question}");
        }
    }

    #[tokio::test]
    async fn zero_dimensions_is_an_error() {
        assert!(HashingEmbedder::new(0).embed("x").await.is_err());
    }
}
