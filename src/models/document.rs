//! Document models flowing through acquisition, extraction and persistence.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DebugMeta;

/// A broker page fetched during one acquisition attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct BrokerPage {
    pub url: String,
    pub html: String,
}

/// A ranked link that may lead to the prospectus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentCandidate {
    pub url: String,
    pub label: String,
    pub score: i32,
}

/// Bytes that passed the network verifier's PDF check.
///
/// Strategies obtain these from the verifier; a value of this type always
/// holds a complete body.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub source_url: String,
    /// True when the server's content type said PDF (as opposed to the
    /// body's magic bytes alone).
    pub content_type_confirmed: bool,
}

impl FetchedDocument {
    pub fn new(bytes: Vec<u8>, source_url: String, content_type_confirmed: bool) -> Self {
        Self {
            bytes,
            source_url,
            content_type_confirmed,
        }
    }
}

/// Which extractor produced a page's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionEngine {
    /// Text layer via pdftotext.
    TextLayer,
    /// OCR of the rendered page image.
    Ocr,
    /// Neither engine produced text.
    Empty,
}

impl ExtractionEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextLayer => "text_layer",
            Self::Ocr => "ocr",
            Self::Empty => "empty",
        }
    }
}

/// Text of one PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// Zero-based page index.
    pub index: usize,
    pub text: String,
    pub engine: ExtractionEngine,
}

impl PageText {
    pub fn new(index: usize, text: impl Into<String>, engine: ExtractionEngine) -> Self {
        Self {
            index,
            text: text.into(),
            engine,
        }
    }
}

/// Detection layer that produced a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanMethod {
    Anchor,
    AggressiveKeyword,
    ScoredBlock,
}

impl SpanMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anchor => "anchor",
            Self::AggressiveKeyword => "aggressive_keyword",
            Self::ScoredBlock => "scored_block",
        }
    }
}

/// Inclusive zero-based page range of the condition report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanResult {
    pub start: usize,
    pub end: usize,
    pub method: SpanMethod,
    pub confidence_meta: serde_json::Value,
}

impl SpanResult {
    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Kind of artifact kept on disk for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Bundle,
    IsolatedReport,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bundle => "bundle",
            Self::IsolatedReport => "isolated_report",
        }
    }
}

/// A document written by the persistence gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Source page range, when the artifact is a slice of a bundle.
    pub page_range: Option<(usize, usize)>,
}

/// A write-once diagnostic record.
#[derive(Debug, Clone, Serialize)]
pub struct FailCase {
    pub timestamp: DateTime<Utc>,
    pub listing_code: String,
    pub label: String,
    pub debug_meta: DebugMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<serde_json::Value>,
    #[serde(skip)]
    pub optional_bytes: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_page_count_is_inclusive() {
        let span = SpanResult {
            start: 4,
            end: 11,
            method: SpanMethod::Anchor,
            confidence_meta: serde_json::Value::Null,
        };
        assert_eq!(span.page_count(), 8);
    }

    #[test]
    fn test_enum_names() {
        assert_eq!(SpanMethod::AggressiveKeyword.as_str(), "aggressive_keyword");
        assert_eq!(ArtifactKind::IsolatedReport.as_str(), "isolated_report");
        assert_eq!(ExtractionEngine::Ocr.as_str(), "ocr");
    }
}
