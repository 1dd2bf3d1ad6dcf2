//! Turns command-line options into a ready [`RagPipeline`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mini_rag::{
    DashScopeClient, DashScopeEmbedder, Document, EmbeddingProvider, HashingEmbedder, LlmClient, LlmConfig,
    LlmKind, MockLlm, RagConfig, RagPipeline, load_document_lines, load_documents,
};
use tracing::info;

use crate::cli::{EmbedderArg, PipelineArgs};
use crate::settings::Settings;

/// Pipeline configuration described by `args`.
///
/// # Errors
///
/// Fails when the values are inconsistent, e.g. `--overlap` not below `--chunk-size`.
pub fn rag_config(args: &PipelineArgs) -> Result<RagConfig> {
    let mut builder = RagConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.overlap)
        .top_k(args.top_k)
        .fetch_k(args.fetch_k)
        .mmr_lambda(args.lambda)
        .search(args.strategy.into())
        .dedup_adjacent(args.dedup_adjacent)
        .embed_batch_size(args.embed_batch_size);
    if let Some(secs) = args.timeout_secs {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }
    builder.build().context("invalid pipeline options")
}

/// The embedding provider selected by `--embedder`.
///
/// # Errors
///
/// Fails when DashScope is selected without an API key.
pub fn embedder(args: &PipelineArgs, settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match args.embedder {
        EmbedderArg::Hashing => Arc::new(match args.embedding_dimensions {
            Some(dims) => HashingEmbedder::new(dims),
            None => HashingEmbedder::default(),
        }),
        EmbedderArg::Dashscope => {
            let mut embedder = DashScopeEmbedder::new(settings.require_api_key()?)?;
            if let Some(model) = &args.embedding_model {
                embedder = embedder.with_model(model);
            }
            if let Some(dims) = args.embedding_dimensions {
                embedder = embedder.with_dimensions(dims);
            }
            Arc::new(embedder)
        }
    };
    Ok(provider)
}

/// The documents named by `--file`, split per line when `--per-line` is set.
///
/// # Errors
///
/// Fails on the first unreadable or unsupported file.
pub async fn documents(args: &PipelineArgs) -> Result<Vec<Document>> {
    if !args.per_line {
        return load_documents(&args.files).await.context("failed to load documents");
    }
    let mut documents = Vec::new();
    for path in &args.files {
        let lines = load_document_lines(path)
            .await
            .with_context(|| format!("failed to load documents from {}", path.display()))?;
        documents.extend(lines);
    }
    Ok(documents)
}

/// The LLM client selected by `--llm`.
///
/// # Errors
///
/// Fails when DashScope is selected without an API key.
pub fn llm(args: &PipelineArgs, settings: &Settings) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match args.llm {
        LlmKind::DashScope => {
            let config = LlmConfig::new(&args.model).with_temperature(args.temperature);
            Arc::new(DashScopeClient::new(settings.require_api_key()?, config)?)
        }
        LlmKind::Mock => Arc::new(MockLlm::default()),
    };
    Ok(client)
}

/// Load the documents, then chunk, embed and index them.
///
/// # Errors
///
/// Any failure here is fatal for the process: bad options, unreadable or
/// unsupported files, missing credentials, or embedding errors.
pub async fn build_pipeline(args: &PipelineArgs, settings: &Settings) -> Result<RagPipeline> {
    let config = rag_config(args)?;
    let embedding_provider = embedder(args, settings)?;
    let llm = llm(args, settings)?;

    let documents = documents(args).await?;
    info!(document_count = documents.len(), per_line = args.per_line, llm = %args.llm, "building index");

    RagPipeline::builder()
        .config(config)
        .embedding_provider(embedding_provider)
        .llm(llm)
        .build(documents)
        .await
        .context("failed to build the vector index")
}
