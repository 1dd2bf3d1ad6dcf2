//! # mini-rag
//!
//! A small retrieval-augmented generation pipeline.
//!
//! ## Overview
//!
//! Documents are split into overlapping fixed-size chunks, embedded, and
//! stored in an immutable exact L2 index. A question is embedded, the most
//! relevant chunks are selected (top-k or maximal marginal relevance), and a
//! prompt built from those chunks is sent to an LLM. The completion is parsed
//! into an [`Answer`] with `answer` and `sources` fields, falling back to the
//! raw text when the model does not return the expected JSON.
//!
//! - [`FixedSizeChunker`]: character windows with overlap
//! - [`EmbeddingProvider`]: [`HashingEmbedder`] (offline), `DashScopeEmbedder` (feature `dashscope`)
//! - [`FlatIndex`]: exact Euclidean nearest-neighbour search
//! - [`Retriever`]: top-k or MMR selection
//! - [`PromptAssembler`]: `[i] chunk` context plus the question
//! - [`LlmClient`]: `DashScopeClient` (feature `dashscope`), [`MockLlm`]
//! - [`RagPipeline`]: build phase and per-query orchestration
//!
//! ## Features
//!
//! - `dashscope`: DashScope text generation and embedding clients (`reqwest`)
//! - `pdf`: PDF text extraction in [`load_document`] (`lopdf`)

pub mod answer;
pub mod chunking;
pub mod config;
#[cfg(feature = "dashscope")]
pub mod dashscope;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod index;
pub mod llm;
pub mod loader;
pub mod mock;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use answer::{Answer, ParsedAnswer, parse_structured};
pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{LlmConfig, RagConfig, RagConfigBuilder, SearchStrategy};
#[cfg(feature = "dashscope")]
pub use dashscope::{DashScopeClient, DashScopeEmbedder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use hashing::HashingEmbedder;
pub use index::{FlatIndex, IndexEntry, Neighbor};
pub use llm::{LlmClient, LlmKind};
pub use loader::{DocumentFormat, load_document, load_document_lines, load_documents};
pub use mock::MockLlm;
pub use pipeline::{QueryError, QueryOutcome, QueryStage, RagPipeline, RagPipelineBuilder};
pub use prompt::{PromptAssembler, PromptTemplate, format_context};
pub use retriever::{Retrieval, Retriever, RetrieverOptions};
