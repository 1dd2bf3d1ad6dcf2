//! Loading documents from disk.
//!
//! Plain text (`.txt`) and Markdown (`.md`) files are read verbatim. PDF files
//! are supported when the `pdf` feature is enabled: text is extracted page by
//! page and pages without extractable text contribute an empty string.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

/// File formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.txt`
    Text,
    /// `.md`
    Markdown,
    /// `.pdf`
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from a path's extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "txt" => Ok(Self::Text),
            "md" => Ok(Self::Markdown),
            "pdf" => Ok(Self::Pdf),
            _ => Err(RagError::UnsupportedFormat { path: path.to_path_buf(), extension }),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Markdown => "md",
            Self::Pdf => "pdf",
        }
    }
}

/// Load a single document. The document id and `source_uri` are the path.
///
/// # Errors
///
/// Returns [`RagError::UnsupportedFormat`] for unknown extensions (and for
/// `.pdf` when the `pdf` feature is disabled) and [`RagError::Io`] when the
/// file cannot be read.
pub async fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;

    let text = match format {
        DocumentFormat::Text | DocumentFormat::Markdown => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RagError::Io { path: path.to_path_buf(), source })?,
        DocumentFormat::Pdf => read_pdf(path.to_path_buf()).await?,
    };

    let id = path.display().to_string();
    info!(document.id = %id, format = format.as_str(), chars = text.chars().count(), "loaded document");

    Ok(Document {
        id: id.clone(),
        text,
        metadata: HashMap::from([("format".to_string(), format.as_str().to_string())]),
        source_uri: Some(id),
    })
}

/// Load several documents in order, stopping at the first failure.
///
/// # Errors
///
/// Propagates the first error returned by [`load_document`].
pub async fn load_documents<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(load_document(path).await?);
    }
    Ok(documents)
}

/// Load a text file as one document per non-empty line.
///
/// Lines are trimmed and blank lines skipped. Each document id is
/// `{path}:{line}` with 1-based line numbers; `source_uri` is the path.
///
/// # Errors
///
/// Same as [`load_document`].
pub async fn load_document_lines(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let file = load_document(path).await?;
    let source = file.id;
    let format = file.metadata.get("format").cloned().unwrap_or_default();

    let documents: Vec<Document> = file
        .text
        .lines()
        .enumerate()
        .filter_map(|(n, line)| {
            let line = line.trim();
            (!line.is_empty()).then(|| Document {
                id: format!("{source}:{}", n + 1),
                text: line.to_string(),
                metadata: HashMap::from([
                    ("format".to_string(), format.clone()),
                    ("line".to_string(), (n + 1).to_string()),
                ]),
                source_uri: Some(source.clone()),
            })
        })
        .collect();

    if documents.is_empty() {
        warn!(path = %source, "file has no non-empty lines");
    }
    Ok(documents)
}

#[cfg(feature = "pdf")]
async fn read_pdf(path: PathBuf) -> Result<String> {
    let io_error = |path: &Path, message: String| RagError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(message),
    };

    let task_path = path.clone();
    tokio::task::spawn_blocking(move || {
        let pdf = lopdf::Document::load(&task_path)
            .map_err(|e| io_error(&task_path, format!("invalid PDF: {e}")))?;

        let mut text = String::new();
        // get_pages is keyed by 1-based page number, already in page order
        for page_number in pdf.get_pages().into_keys() {
            match pdf.extract_text(&[page_number]) {
                Ok(page_text) => text.push_str(&page_text),
                Err(e) => debug!(page = page_number, error = %e, "page has no extractable text"),
            }
        }
        Ok::<_, RagError>(text)
    })
    .await
    .map_err(|e| io_error(&path, format!("PDF extraction task failed: {e}")))?
}

#[cfg(not(feature = "pdf"))]
async fn read_pdf(path: PathBuf) -> Result<String> {
    debug!(path = %path.display(), "PDF support is disabled (enable the `pdf` feature)");
    Err(RagError::UnsupportedFormat { path, extension: "pdf".to_string() })
}
