//! Build-then-query orchestration.
//!
//! The [`RagPipeline`] ties the stages together. At build time it runs
//! chunk → embed → index once over every document; afterwards the index is
//! read-only and each query runs
//! embed → retrieve → assemble prompt → complete → parse.
//!
//! # Example
//!
//! ```rust,ignore
//! use mini_rag::{HashingEmbedder, MockLlm, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbedder::new(256)))
//!     .llm(Arc::new(MockLlm::default()))
//!     .build(documents)
//!     .await?;
//!
//! let answer = pipeline.ask("What is RAG?").await?.into_answer();
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::answer::ParsedAnswer;
use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::{EmbeddingProvider, check_batch};
use crate::error::{RagError, Result};
use crate::index::FlatIndex;
use crate::llm::LlmClient;
use crate::prompt::{PromptAssembler, PromptTemplate};
use crate::retriever::{Retriever, RetrieverOptions};

/// Steps a query moves through on the success path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// The question was accepted.
    ReceivedQuestion,
    /// The question was embedded.
    Embedded,
    /// Chunks were selected from the index.
    Retrieved,
    /// The prompt was built.
    PromptAssembled,
    /// The LLM returned a completion.
    LlmInvoked,
    /// The completion was parsed (structured or raw fallback).
    ResponseParsed,
    /// The answer is ready.
    Done,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReceivedQuestion => "received_question",
            Self::Embedded => "embedded",
            Self::Retrieved => "retrieved",
            Self::PromptAssembled => "prompt_assembled",
            Self::LlmInvoked => "llm_invoked",
            Self::ResponseParsed => "response_parsed",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a single query. Each variant carries the originating error.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The question could not be embedded.
    #[error("embedding failed: {0}")]
    EmbeddingFailed(#[source] RagError),
    /// The index rejected the search.
    #[error("retrieval failed: {0}")]
    RetrievalFailed(#[source] RagError),
    /// The LLM call failed.
    #[error("LLM call failed: {0}")]
    LlmFailed(#[source] RagError),
}

impl QueryError {
    /// The underlying error.
    pub fn error(&self) -> &RagError {
        match self {
            Self::EmbeddingFailed(e) | Self::RetrievalFailed(e) | Self::LlmFailed(e) => e,
        }
    }

    /// Whether the failure was a deadline expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self.error(), RagError::Timeout { .. })
    }
}

/// Everything produced while answering one question.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Retrieved chunks, most relevant first.
    pub retrieved: Vec<SearchResult>,
    /// The exact prompt sent to the LLM.
    pub prompt: String,
    /// The parsed completion.
    pub answer: ParsedAnswer,
}

/// The RAG pipeline.
///
/// Holds the immutable index and the query-time collaborators. It has no
/// interior mutability, so one instance can serve concurrent queries behind
/// an `Arc`.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    retriever: Retriever,
    assembler: PromptAssembler,
}

impl fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagPipeline")
            .field("config", &self.config)
            .field("llm", &self.llm.name())
            .field("entries", &self.retriever.index().len())
            .finish_non_exhaustive()
    }
}

impl RagPipeline {
    /// Start configuring a pipeline.
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// The validated configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The vector index built from the documents.
    pub fn index(&self) -> &Arc<FlatIndex> {
        self.retriever.index()
    }

    /// Embed the question and select chunks for it.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmbeddingFailed`] or [`QueryError::RetrievalFailed`].
    pub async fn retrieve(&self, question: &str) -> std::result::Result<Vec<SearchResult>, QueryError> {
        let query_embedding = self.embed_question(question).await?;
        self.select(&query_embedding)
    }

    /// Answer a question: embed → retrieve → assemble → complete → parse.
    ///
    /// A completion that does not follow the JSON contract is not an error;
    /// it comes back as [`ParsedAnswer::RawFallback`].
    ///
    /// # Errors
    ///
    /// Returns the [`QueryError`] of the stage that failed. Nothing is retried.
    pub async fn ask(&self, question: &str) -> std::result::Result<ParsedAnswer, QueryError> {
        Ok(self.run(question).await?.answer)
    }

    /// Like [`ask`](Self::ask) but also returns the retrieved chunks and the prompt.
    ///
    /// # Errors
    ///
    /// Returns the [`QueryError`] of the stage that failed.
    #[instrument(skip_all, fields(question_len = question.len()))]
    pub async fn run(&self, question: &str) -> std::result::Result<QueryOutcome, QueryError> {
        debug!(stage = %QueryStage::ReceivedQuestion);

        let query_embedding = self.embed_question(question).await?;
        debug!(stage = %QueryStage::Embedded, dimensions = query_embedding.len());

        let retrieved = self.select(&query_embedding)?;
        debug!(stage = %QueryStage::Retrieved, chunk_count = retrieved.len());

        let prompt = self.assembler.assemble(question, retrieved.iter().map(|r| &r.chunk));
        debug!(stage = %QueryStage::PromptAssembled, prompt_len = prompt.len());

        let completion = with_timeout("LLM completion", self.config.request_timeout, self.llm.complete(&prompt))
            .await
            .map_err(|e| {
                error!(llm = self.llm.name(), error = %e, "LLM call failed");
                QueryError::LlmFailed(e)
            })?;
        debug!(stage = %QueryStage::LlmInvoked, completion_len = completion.len());

        let answer = ParsedAnswer::from_completion(&completion);
        if let ParsedAnswer::RawFallback { reason, .. } = &answer {
            debug!(reason = %reason, "completion is not a structured answer, using raw text");
        }
        debug!(stage = %QueryStage::ResponseParsed, structured = answer.is_structured());

        info!(stage = %QueryStage::Done, chunk_count = retrieved.len(), structured = answer.is_structured(), "query completed");
        Ok(QueryOutcome { retrieved, prompt, answer })
    }

    async fn embed_question(&self, question: &str) -> std::result::Result<Vec<f32>, QueryError> {
        with_timeout("query embedding", self.config.request_timeout, self.embedding_provider.embed(question))
            .await
            .map_err(|e| {
                error!(embedder = self.embedding_provider.name(), error = %e, "embedding failed during query");
                QueryError::EmbeddingFailed(e)
            })
    }

    fn select(&self, query_embedding: &[f32]) -> std::result::Result<Vec<SearchResult>, QueryError> {
        self.retriever.retrieve_all(query_embedding).map_err(|e| {
            error!(error = %e, "retrieval failed");
            QueryError::RetrievalFailed(e)
        })
    }
}

/// Run `future`, failing with [`RagError::Timeout`] if `timeout` elapses first.
async fn with_timeout<T>(
    operation: &'static str,
    timeout: Option<Duration>,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| RagError::Timeout { operation, timeout: limit })?,
        None => future.await,
    }
}

/// Collects the collaborators of a [`RagPipeline`] and runs the build phase.
///
/// The embedding provider and the LLM client are required. Without an explicit
/// chunker a [`FixedSizeChunker`] is created from the config's chunk size and
/// overlap. [`build`](RagPipelineBuilder::build) runs the whole build phase.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    llm: Option<Arc<dyn LlmClient>>,
    chunker: Option<Arc<dyn Chunker>>,
    template: Option<PromptTemplate>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration (defaults to [`RagConfig::default`]).
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the LLM client.
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Override the prompt template (defaults to [`PromptTemplate::structured`]).
    pub fn prompt_template(mut self, template: PromptTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Validate the configuration, then chunk, embed and index `documents`.
    ///
    /// Either every chunk ends up in the index, at an id equal to its position
    /// in document-then-chunk order, or the build fails; there is no partial index.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidConfiguration`] for bad config or missing collaborators
    /// - [`RagError::Embedding`] / [`RagError::Timeout`] if embedding fails
    /// - [`RagError::DimensionMismatch`] if the provider returns inconsistent vectors
    pub async fn build(self, documents: impl IntoIterator<Item = Document>) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::invalid("embedding_provider is required"))?;
        let llm = self.llm.ok_or_else(|| RagError::invalid("llm is required"))?;
        let chunker: Arc<dyn Chunker> = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };

        // 1. Chunk every document
        let mut chunks: Vec<Chunk> = Vec::new();
        for document in documents {
            let document_chunks = chunker.chunk(&document);
            info!(document.id = %document.id, chunk_count = document_chunks.len(), "chunked document");
            chunks.extend(document_chunks);
        }

        // 2. Embed in batches
        let embeddings = embed_chunks(embedding_provider.as_ref(), &chunks, &config).await?;

        // 3. Build the index
        let index = Arc::new(FlatIndex::build(chunks.into_iter().zip(embeddings))?);
        info!(
            entries = index.len(),
            dimensions = index.dimensions().unwrap_or_default(),
            "vector index built"
        );

        let retriever = Retriever::new(index, RetrieverOptions::from(&config))?;
        Ok(RagPipeline {
            config,
            embedding_provider,
            llm,
            retriever,
            assembler: PromptAssembler::new(self.template.unwrap_or_default()),
        })
    }
}

async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: &[Chunk],
    config: &RagConfig,
) -> Result<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(config.embed_batch_size) {
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let vectors = with_timeout("chunk embedding", config.request_timeout, provider.embed_batch(&texts))
            .await
            .inspect_err(|e| error!(embedder = provider.name(), error = %e, "embedding failed during index build"))?;
        check_batch(provider.name(), &vectors, texts.len())?;
        embeddings.extend(vectors);
    }
    debug!(vector_count = embeddings.len(), "embedded chunks");
    Ok(embeddings)
}
