//! Parsing LLM completions into structured answers.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// The answer returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text.
    pub answer: String,
    /// Cited chunk identifiers or excerpts, in the order the model gave them.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Outcome of parsing a completion: either the model honoured the JSON
/// contract, or its raw text is used as the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAnswer {
    /// The completion was a valid `{"answer", "sources"}` object.
    Structured(Answer),
    /// The completion was not structured; `answer` is the raw completion text.
    RawFallback {
        /// The raw completion.
        answer: String,
        /// Why structured parsing failed.
        reason: String,
    },
}

impl ParsedAnswer {
    /// Parse `completion`, falling back to the raw text when it is not a structured answer.
    pub fn from_completion(completion: &str) -> Self {
        match parse_structured(completion) {
            Ok(answer) => Self::Structured(answer),
            Err(e) => Self::RawFallback { answer: completion.to_string(), reason: e.to_string() },
        }
    }

    /// Whether the structured branch was taken.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Collapse into an [`Answer`]; the fallback branch has no sources.
    pub fn into_answer(self) -> Answer {
        match self {
            Self::Structured(answer) => answer,
            Self::RawFallback { answer, .. } => Answer { answer, sources: Vec::new() },
        }
    }
}

/// Parse a completion that should contain a JSON answer object.
///
/// Surrounding whitespace and a Markdown code fence (```` ```json ````) are
/// tolerated.
///
/// # Errors
///
/// Returns [`RagError::Parse`] if the text is not a JSON object with a string
/// `answer` field (and, if present, a string-array `sources` field).
pub fn parse_structured(completion: &str) -> Result<Answer> {
    let body = strip_code_fence(completion.trim());
    serde_json::from_str::<Answer>(body).map_err(|e| RagError::Parse(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    match inner.split_once('\n') {
        Some((_, body)) => body.trim(),
        None => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_completion() {
        let parsed = ParsedAnswer::from_completion(
            r#"{"answer": "Retrieval augmented generation.", "sources": ["[0]", "[2]"]}"#,
        );
        assert!(parsed.is_structured());
        assert_eq!(
            parsed.into_answer(),
            Answer {
                answer: "Retrieval augmented generation.".into(),
                sources: vec!["[0]".into(), "[2]".into()],
            }
        );
    }

    #[test]
    fn plain_text_falls_back_to_raw_answer() {
        let parsed = ParsedAnswer::from_completion("I don't know.");
        assert!(!parsed.is_structured());
        assert_eq!(parsed.into_answer(), Answer { answer: "I don't know.".into(), sources: vec![] });
    }

    #[test]
    fn fenced_json_is_accepted() {
        let completion = "```json\n{\"answer\": \"Paris\", \"sources\": [\"[1]\"]}\n```";
        assert_eq!(parse_structured(completion).unwrap().answer, "Paris");
    }

    #[test]
    fn missing_sources_default_to_empty() {
        let answer = parse_structured(r#"  {"answer": "yes"}  "#).unwrap();
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn wrong_shapes_are_parse_errors() {
        for completion in [r#"{"sources": []}"#, r#"{"answer": 3}"#, "[1, 2]", r#"{"answer": "x", "sources": "y"}"#] {
            assert!(matches!(parse_structured(completion), Err(RagError::Parse(_))), "{completion}");
        }
    }

    #[test]
    fn fallback_keeps_the_completion_verbatim() {
        let raw = "  {\"answer\": truncated";
        match ParsedAnswer::from_completion(raw) {
            ParsedAnswer::RawFallback { answer, reason } => {
                assert_eq!(answer, raw);
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
