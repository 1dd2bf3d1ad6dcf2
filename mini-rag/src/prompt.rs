//! Prompt assembly.
//!
//! Retrieved chunks are tagged with their rank (`[0] …`, `[1] …`), joined by
//! blank lines, and substituted together with the verbatim question into a
//! [`PromptTemplate`].

use crate::document::Chunk;
use crate::error::{RagError, Result};

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

const STRUCTURED_TEMPLATE: &str = r#"You are a rigorous question-answering assistant.
Answer using only the context below.
You must reply with JSON in exactly this format:
{
    "answer": "...",
    "sources": ["...", "..."]
}
Context:
{context}
Question:
{question}
"#;

const PLAIN_TEMPLATE: &str = "You are a rigorous question-answering assistant.
Answer using only the context below.
If the context does not cover the question, reply \"This cannot be determined from the given content.\"
Context:
{context}
Question:
{question}
";

/// A prompt with `{context}` and `{question}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// The default template, requiring a JSON `{"answer", "sources"}` reply.
    pub fn structured() -> Self {
        Self { template: STRUCTURED_TEMPLATE.to_string() }
    }

    /// A free-text template; replies always take the raw-text answer path.
    pub fn plain() -> Self {
        Self { template: PLAIN_TEMPLATE.to_string() }
    }

    /// A custom template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] unless the template contains
    /// both `{context}` and `{question}`.
    pub fn custom(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(RagError::invalid(format!("prompt template is missing {placeholder}")));
            }
        }
        Ok(Self { template })
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.template
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::structured()
    }
}

/// Formats chunks as `[i] text` blocks separated by blank lines.
pub fn format_context<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{i}] {}", chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the final prompt string sent to the LLM.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    template: PromptTemplate,
}

impl PromptAssembler {
    /// Create an assembler around `template`.
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// The template in use.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Substitute the formatted chunks and the question into the template.
    ///
    /// Placeholders that happen to appear inside chunk text or the question
    /// are left untouched.
    pub fn assemble<'a>(&self, question: &str, chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
        let context = format_context(chunks);
        let (head, tail) = self
            .template
            .as_str()
            .split_once(QUESTION_PLACEHOLDER)
            .unwrap_or((self.template.as_str(), ""));
        let mut prompt = head.replace(CONTEXT_PLACEHOLDER, &context);
        if self.template.as_str().contains(QUESTION_PLACEHOLDER) {
            prompt.push_str(question);
            prompt.push_str(&tail.replace(CONTEXT_PLACEHOLDER, &context));
        }
        prompt
    }
}
