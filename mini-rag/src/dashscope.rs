//! Alibaba Cloud DashScope integrations: text generation and text embeddings.
//!
//! This module is only available when the `dashscope` feature is enabled.
//! Both clients call the DashScope HTTP API directly with `reqwest`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::LlmConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LlmClient;

/// The default DashScope API base URL.
pub const DASHSCOPE_API_BASE: &str = "https://dashscope.aliyuncs.com/api/v1";

/// Environment variable holding the API key.
pub const DASHSCOPE_API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

const GENERATION_PATH: &str = "/services/aigc/text-generation/generation";
const EMBEDDING_PATH: &str = "/services/embeddings/text-embedding/text-embedding";

/// The default embedding model.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-v3";

/// The default dimensionality for `text-embedding-v3`.
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1024;

/// Maximum number of texts `text-embedding-v3` accepts per request.
const MAX_EMBEDDING_BATCH: usize = 10;

const PROVIDER: &str = "DashScope";

fn api_key_from_env() -> Result<String> {
    std::env::var(DASHSCOPE_API_KEY_ENV).map_err(|_| RagError::Auth {
        provider: PROVIDER.into(),
        message: format!("{DASHSCOPE_API_KEY_ENV} environment variable not set"),
    })
}

fn require_key(api_key: String) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(RagError::Auth {
            provider: PROVIDER.into(),
            message: "API key must not be empty".into(),
        });
    }
    Ok(api_key)
}

// ── API request/response types ─────────────────────────────────────

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationInput<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct GenerationParameters {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Deserialize)]
struct GenerationOutput {
    text: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
    parameters: EmbeddingParameters,
}

#[derive(Serialize)]
struct EmbeddingInput<'a> {
    texts: &'a [&'a str],
}

#[derive(Serialize)]
struct EmbeddingParameters {
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    output: EmbeddingOutput,
}

#[derive(Deserialize)]
struct EmbeddingOutput {
    embeddings: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    text_index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Extract a readable error detail from a DashScope error body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { code: Some(code), message: Some(message) }) => format!("{code}: {message}"),
        Ok(ErrorResponse { code: None, message: Some(message) }) => message,
        Ok(ErrorResponse { code: Some(code), message: None }) => code,
        _ => body.to_string(),
    }
}

/// Map a non-success generation response onto the LLM error taxonomy.
fn classify_generation_error(status: StatusCode, body: &str) -> RagError {
    let provider = PROVIDER.to_string();
    let message = format!("API returned {status}: {}", error_detail(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RagError::Auth { provider, message },
        StatusCode::TOO_MANY_REQUESTS => RagError::RateLimited { provider, message },
        _ => RagError::Upstream { provider, message },
    }
}

// ── LLM client ─────────────────────────────────────────────────────

/// An [`LlmClient`] backed by the DashScope text-generation API (Qwen models).
///
/// # Example
///
/// ```rust,ignore
/// use mini_rag::{LlmConfig, dashscope::DashScopeClient};
///
/// let client = DashScopeClient::from_env(LlmConfig::new("qwen-plus"))?;
/// let text = client.complete("Say hello").await?;
/// ```
pub struct DashScopeClient {
    client: reqwest::Client,
    api_key: String,
    config: LlmConfig,
    base_url: String,
}

impl DashScopeClient {
    /// Create a client with an explicit API key.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Auth`] if the key is empty.
    pub fn new(api_key: impl Into<String>, config: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: require_key(api_key.into())?,
            config,
            base_url: DASHSCOPE_API_BASE.to_string(),
        })
    }

    /// Create a client using the `DASHSCOPE_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Auth`] if the variable is unset or empty.
    pub fn from_env(config: LlmConfig) -> Result<Self> {
        Self::new(api_key_from_env()?, config)
    }

    /// Point the client at a different API base (e.g. the international endpoint).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LlmClient for DashScopeClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.config.model, prompt_len = prompt.len(), "requesting completion");

        let request_body = GenerationRequest {
            model: &self.config.model,
            input: GenerationInput { prompt },
            parameters: GenerationParameters { temperature: self.config.temperature },
        };

        let response = self
            .client
            .post(format!("{}{GENERATION_PATH}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::Upstream { provider: PROVIDER.into(), message: format!("request failed: {e}") }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "API error");
            return Err(classify_generation_error(status, &body));
        }

        let generation: GenerationResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::Upstream {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        info!(provider = PROVIDER, request_id = generation.request_id.as_deref().unwrap_or("-"), "completion received");
        Ok(generation.output.text)
    }
}

// ── Embedding provider ─────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the DashScope text-embedding API.
///
/// Batches larger than the API limit are split into several requests.
pub struct DashScopeEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    base_url: String,
}

impl DashScopeEmbedder {
    /// Create a provider with the given API key, using `text-embedding-v3` at 1024 dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Auth`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: require_key(api_key.into())?,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            base_url: DASHSCOPE_API_BASE.to_string(),
        })
    }

    /// Create a provider using the `DASHSCOPE_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Auth`] if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::new(api_key_from_env()?)
    }

    /// Set the model name (e.g. `text-embedding-v2`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions requested from the API.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self
    }

    /// Point the provider at a different API base.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn embedding_error(message: String) -> RagError {
        RagError::Embedding { provider: PROVIDER.into(), message }
    }

    async fn embed_request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: EmbeddingInput { texts },
            parameters: EmbeddingParameters { dimension: self.dimensions },
        };

        let response = self
            .client
            .post(format!("{}{EMBEDDING_PATH}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                Self::embedding_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, %status, "embedding API error");
            return Err(Self::embedding_error(format!("API returned {status}: {}", error_detail(&body))));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Self::embedding_error(format!("failed to parse response: {e}")))?;

        order_embeddings(parsed.output.embeddings, texts.len())
    }
}

/// Place embeddings at their `text_index`, checking every input got exactly one.
fn order_embeddings(data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut ordered: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        let slot = ordered.get_mut(item.text_index).ok_or_else(|| {
            DashScopeEmbedder::embedding_error(format!("unexpected text_index {}", item.text_index))
        })?;
        *slot = Some(item.embedding);
    }
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| DashScopeEmbedder::embedding_error(format!("missing embedding for input {i}"))))
        .collect()
}

#[async_trait]
impl EmbeddingProvider for DashScopeEmbedder {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| Self::embedding_error("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBEDDING_BATCH) {
            embeddings.extend(self.embed_request(batch).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
