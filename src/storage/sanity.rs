//! Strict sanity check applied to every isolated-report artifact.

use thiserror::Error;

use crate::config::Thresholds;
use crate::ocr::PdfEngine;
use crate::span::has_strict_title;

/// Why an artifact was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanityFailure {
    #[error("document is {size} bytes, minimum is {min}")]
    TooSmall { size: u64, min: u64 },

    #[error("document has {pages} pages, minimum is {min}")]
    TooFewPages { pages: usize, min: usize },

    #[error("no report title on the first {checked} pages")]
    MissingTitle { checked: usize },

    #[error("document unreadable: {0}")]
    Unreadable(String),
}

impl SanityFailure {
    /// Short label used in failcase filenames and debug metadata.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TooSmall { .. } => "too_small",
            Self::TooFewPages { .. } => "too_few_pages",
            Self::MissingTitle { .. } => "missing_title",
            Self::Unreadable(_) => "unreadable",
        }
    }
}

/// Size floor, page floor and (for slices) a strict title on the leading
/// pages.
pub struct SanityCheck<'a> {
    thresholds: &'a Thresholds,
    engine: &'a dyn PdfEngine,
}

impl<'a> SanityCheck<'a> {
    pub fn new(thresholds: &'a Thresholds, engine: &'a dyn PdfEngine) -> Self {
        Self { thresholds, engine }
    }

    pub fn check(&self, bytes: &[u8], size: u64, require_title: bool) -> Result<(), SanityFailure> {
        if size < self.thresholds.min_report_bytes {
            return Err(SanityFailure::TooSmall {
                size,
                min: self.thresholds.min_report_bytes,
            });
        }

        let pages = self
            .engine
            .page_count(bytes)
            .map_err(|e| SanityFailure::Unreadable(e.to_string()))?;
        if pages < self.thresholds.min_report_pages {
            return Err(SanityFailure::TooFewPages {
                pages,
                min: self.thresholds.min_report_pages,
            });
        }

        if require_title {
            let texts = self
                .engine
                .page_texts(bytes)
                .map_err(|e| SanityFailure::Unreadable(e.to_string()))?;
            let checked = self.thresholds.title_check_pages;
            let titled = texts
                .iter()
                .take(checked)
                .any(|p| has_strict_title(&p.text, self.thresholds.title_line_window));
            if !titled {
                return Err(SanityFailure::MissingTitle { checked });
            }
        }

        Ok(())
    }
}
