//! A scripted [`LlmClient`] for tests and offline runs.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{RagError, Result};
use crate::llm::LlmClient;

/// What the mock does when asked to complete a prompt.
#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    Auth,
    RateLimited,
    Upstream,
}

/// An [`LlmClient`] that returns a fixed completion (or a fixed error) and
/// records every prompt it receives.
///
/// # Example
///
/// ```rust,ignore
/// use mini_rag::{LlmClient, MockLlm};
///
/// let llm = MockLlm::new(r#"{"answer": "42", "sources": ["[0]"]}"#);
/// let completion = llm.complete("prompt").await?;
/// assert_eq!(llm.prompts().await, vec!["prompt".to_string()]);
/// ```
#[derive(Debug)]
pub struct MockLlm {
    behavior: Behavior,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    /// Always reply with `completion`.
    pub fn new(completion: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Reply(completion.into()))
    }

    /// Always fail with [`RagError::Auth`].
    pub fn failing_auth() -> Self {
        Self::with_behavior(Behavior::Auth)
    }

    /// Always fail with [`RagError::RateLimited`].
    pub fn rate_limited() -> Self {
        Self::with_behavior(Behavior::RateLimited)
    }

    /// Always fail with [`RagError::Upstream`].
    pub fn failing_upstream() -> Self {
        Self::with_behavior(Behavior::Upstream)
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self { behavior, prompts: Mutex::new(Vec::new()) }
    }

    /// Every prompt received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new(r#"{"answer": "This is a mock answer.", "sources": []}"#)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().await.push(prompt.to_string());
        let provider = "Mock".to_string();
        match &self.behavior {
            Behavior::Reply(completion) => Ok(completion.clone()),
            Behavior::Auth => Err(RagError::Auth { provider, message: "no API key configured".into() }),
            Behavior::RateLimited => {
                Err(RagError::RateLimited { provider, message: "quota exceeded".into() })
            }
            Behavior::Upstream => {
                Err(RagError::Upstream { provider, message: "service unavailable".into() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_and_records_prompts() {
        let llm = MockLlm::new("hello");
        assert_eq!(llm.complete("one").await.unwrap(), "hello");
        assert_eq!(llm.complete("two").await.unwrap(), "hello");
        assert_eq!(llm.prompts().await, ["one", "two"]);
    }

    #[tokio::test]
    async fn scripted_failures() {
        assert!(matches!(MockLlm::failing_auth().complete("p").await, Err(RagError::Auth { .. })));
        assert!(matches!(MockLlm::rate_limited().complete("p").await, Err(RagError::RateLimited { .. })));
        assert!(matches!(
            MockLlm::failing_upstream().complete("p").await,
            Err(RagError::Upstream { .. })
        ));
    }
}
