use crate::record::ProductRecord;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

/// Why one image produced no record. Every variant is local to its item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("text extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("listing generation failed: {0}")]
    GenerationFailure(String),

    #[error("no JSON object found in listing response")]
    NoJsonFound,

    #[error("invalid JSON in listing response: {0}")]
    InvalidJson(String),
}

impl ExtractionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExtractionFailure(_) => "extraction_failure",
            Self::GenerationFailure(_) => "generation_failure",
            Self::NoJsonFound => "no_json_found",
            Self::InvalidJson(_) => "invalid_json",
        }
    }
}

fn brace_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Span from the first `{` to the last `}` inclusive, braces not balanced.
///
/// Prose containing braces, or a reply with two objects, yields a span that
/// will not parse. Callers rely on that exact span.
pub fn isolate_json(response: &str) -> Option<&str> {
    brace_span().find(response).map(|m| m.as_str())
}

pub fn parse_listing(response: &str) -> Result<ProductRecord, ExtractionError> {
    let span = isolate_json(response).ok_or(ExtractionError::NoJsonFound)?;
    let map: Map<String, Value> =
        serde_json::from_str(span).map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
    Ok(ProductRecord::from_map(map))
}

/// The human-readable part of a reply: everything before the first `{`.
pub fn listing_text(response: &str) -> &str {
    match response.find('{') {
        Some(i) => response[..i].trim(),
        None => response.trim(),
    }
}
