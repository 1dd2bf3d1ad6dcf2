//! Pipeline and generation settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How the retriever selects chunks from the vector index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Return the `top_k` nearest entries directly.
    TopK,
    /// Fetch `fetch_k` nearest entries, then re-rank them with maximal marginal relevance.
    #[default]
    Mmr,
}

/// Chunking, retrieval and embedding parameters. Defaults match the CLI defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks; must be below `chunk_size`.
    pub chunk_overlap: usize,
    /// Number of chunks handed to the prompt.
    pub top_k: usize,
    /// Size of the candidate pool fetched before MMR re-ranking.
    pub fetch_k: usize,
    /// Chunk selection strategy.
    pub search: SearchStrategy,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure diversity.
    pub mmr_lambda: f32,
    /// Skip chunks that sit right next to an already retrieved chunk of the same document.
    pub dedup_adjacent: bool,
    /// Number of chunk texts sent to the embedder per request during the build phase.
    pub embed_batch_size: usize,
    /// Deadline applied to every embedder and LLM call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
            top_k: 3,
            fetch_k: 10,
            search: SearchStrategy::Mmr,
            mmr_lambda: 0.5,
            dedup_adjacent: false,
            embed_batch_size: 16,
            request_timeout: None,
        }
    }
}

impl RagConfig {
    /// Start from the defaults and override fields one by one.
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `fetch_k < top_k`
    /// - `mmr_lambda` is outside `[0, 1]`
    /// - `embed_batch_size == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::invalid("chunk_size must be greater than zero"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::invalid(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::invalid("top_k must be greater than zero"));
        }
        if self.fetch_k < self.top_k {
            return Err(RagError::invalid(format!(
                "fetch_k ({}) must be at least top_k ({})",
                self.fetch_k, self.top_k
            )));
        }
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return Err(RagError::invalid(format!(
                "mmr_lambda ({}) must be within [0, 1]",
                self.mmr_lambda
            )));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::invalid("embed_batch_size must be greater than zero"));
        }
        Ok(())
    }
}

/// Validating builder for [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the chunk overlap in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks returned per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the MMR candidate pool size.
    pub fn fetch_k(mut self, k: usize) -> Self {
        self.config.fetch_k = k;
        self
    }

    /// Set the chunk selection strategy.
    pub fn search(mut self, strategy: SearchStrategy) -> Self {
        self.config.search = strategy;
        self
    }

    /// Set the MMR relevance/diversity trade-off.
    pub fn mmr_lambda(mut self, lambda: f32) -> Self {
        self.config.mmr_lambda = lambda;
        self
    }

    /// Enable or disable skipping of adjacent chunks from the same document.
    pub fn dedup_adjacent(mut self, enabled: bool) -> Self {
        self.config.dedup_adjacent = enabled;
        self
    }

    /// Set how many chunk texts are embedded per provider call.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Abort embedder and LLM calls that take longer than `timeout`.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Validate and return the config.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Generation settings for the LLM client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Model name, e.g. `qwen-plus`.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { model: "qwen-plus".to_string(), temperature: 0.7 }
    }
}

impl LlmConfig {
    /// Create a config for `model` with the default temperature.
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), ..Self::default() }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
