//! Turning text into vectors.
//!
//! Both phases go through an [`EmbeddingProvider`]: the build phase embeds
//! every chunk in batches, and each query embeds the question once. All
//! vectors from one provider share a length, because the index compares them
//! by Euclidean distance.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// An embedding backend.
///
/// `HashingEmbedder` runs offline; `DashScopeEmbedder` (feature `dashscope`)
/// calls a remote API and overrides [`embed_batch`](Self::embed_batch) to
/// send several texts per request.
///
/// ```rust,ignore
/// use mini_rag::{EmbeddingProvider, HashingEmbedder};
///
/// let provider = HashingEmbedder::new(64);
/// let vectors = provider.embed_batch(&["first chunk", "second chunk"]).await?;
/// assert!(vectors.iter().all(|v| v.len() == provider.dimensions()));
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str {
        "embedder"
    }

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning one vector per text in input order.
    ///
    /// Calls [`embed`](Self::embed) for each text in turn unless overridden.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}

/// Reject a batch answer that does not hold exactly one vector per input.
pub(crate) fn check_batch(provider: &str, vectors: &[Vec<f32>], inputs: usize) -> Result<()> {
    if vectors.len() == inputs {
        return Ok(());
    }
    Err(RagError::Embedding {
        provider: provider.to_string(),
        message: format!("provider returned {} vectors for {inputs} inputs", vectors.len()),
    })
}
