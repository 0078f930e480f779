//! PDF text extraction and page slicing.
//!
//! Text comes from the poppler text layer; pages without one are rendered
//! and passed through Tesseract when it is installed. Everything that reads
//! or rewrites PDF structure goes through the `PdfEngine` trait so the span
//! detector and persistence gate can run against a fake engine.

mod extractor;
mod tesseract;
mod tools;

pub use extractor::PopplerEngine;
pub use tesseract::TesseractOcr;
pub use tools::{check_binary, check_tools};

use thiserror::Error;

use crate::models::PageText;

/// Errors that can occur reading or slicing a PDF.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid page range {start}..={end} for {page_count} pages")]
    InvalidRange {
        start: usize,
        end: usize,
        page_count: usize,
    },
}

/// PDF operations the pipeline needs.
pub trait PdfEngine: Send + Sync {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfError>;

    /// One entry per page, in page order.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<PageText>, PdfError>;

    /// New document holding pages `start..=end` (zero-based).
    fn slice(&self, pdf: &[u8], start: usize, end: usize) -> Result<Vec<u8>, PdfError>;
}

/// Whole-document text for downstream analysis. Pages are separated by a
/// blank line.
pub fn extract_text(engine: &dyn PdfEngine, pdf: &[u8]) -> Result<String, PdfError> {
    let pages = engine.page_texts(pdf)?;
    Ok(pages
        .iter()
        .map(|p| p.text.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n"))
}
