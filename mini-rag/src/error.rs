//! Error types for the `mini-rag` crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while building or querying a RAG pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking, retrieval or pipeline parameters are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The document loader does not recognise the file extension.
    #[error("Unsupported document format '{extension}': {}", path.display())]
    UnsupportedFormat {
        /// The path that was rejected.
        path: PathBuf,
        /// The (lowercased) extension, empty if the file had none.
        extension: String,
    },

    /// A document could not be read from disk.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A vector's length differs from the dimension fixed by the index.
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch {
        /// The index dimension.
        expected: usize,
        /// The offending vector's length.
        actual: usize,
    },

    /// A search was issued against an index built from zero entries.
    #[error("Vector index is empty")]
    EmptyIndex,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The LLM provider rejected or is missing credentials.
    #[error("Authentication error ({provider}): {message}")]
    Auth {
        /// The LLM provider.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The LLM provider throttled the request.
    #[error("Rate limited ({provider}): {message}")]
    RateLimited {
        /// The LLM provider.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Any other provider-side or transport failure.
    #[error("Upstream error ({provider}): {message}")]
    Upstream {
        /// The LLM provider.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An embedder or LLM call exceeded the configured deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        /// The operation that was aborted.
        operation: &'static str,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// An LLM completion did not follow the structured answer contract.
    ///
    /// The pipeline recovers from this locally; see [`ParsedAnswer`](crate::ParsedAnswer).
    #[error("Parse error: {0}")]
    Parse(String),
}

impl RagError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
