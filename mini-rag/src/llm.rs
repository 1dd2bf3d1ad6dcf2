//! LLM client trait for turning prompts into completions.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A text-completion backend.
///
/// Failures are reported as [`RagError::Auth`](crate::RagError::Auth),
/// [`RagError::RateLimited`](crate::RagError::RateLimited) or
/// [`RagError::Upstream`](crate::RagError::Upstream). Clients never retry.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Identifier used in logs, usually the model name.
    fn name(&self) -> &str;

    /// Complete `prompt` and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// The LLM backends shipped with this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmKind {
    /// Alibaba Cloud DashScope (requires the `dashscope` feature).
    #[default]
    DashScope,
    /// [`MockLlm`](crate::MockLlm), for tests and offline runs.
    Mock,
}

impl fmt::Display for LlmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DashScope => "dashscope",
            Self::Mock => "mock",
        })
    }
}

impl FromStr for LlmKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dashscope" => Ok(Self::DashScope),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown LLM backend '{other}' (expected dashscope or mock)")),
        }
    }
}
