//! Poppler-backed PDF engine: page count, per-page text, page slicing.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};

use super::tesseract::TesseractOcr;
use super::tools::{check_cmd_status, handle_cmd_output};
use super::{PdfEngine, PdfError};
use crate::models::{ExtractionEngine, PageText};

/// Page separator pdftotext emits after every page.
const FORM_FEED: char = '\u{000C}';

/// PDF engine shelling out to poppler-utils, with Tesseract for pages that
/// have no text layer.
#[derive(Debug, Clone)]
pub struct PopplerEngine {
    ocr: Option<TesseractOcr>,
}

impl Default for PopplerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PopplerEngine {
    /// Engine with OCR enabled when Tesseract is installed.
    pub fn new() -> Self {
        Self {
            ocr: TesseractOcr::detect(),
        }
    }

    pub fn without_ocr() -> Self {
        Self { ocr: None }
    }

    pub fn with_ocr(ocr: TesseractOcr) -> Self {
        Self { ocr: Some(ocr) }
    }

    pub fn has_ocr(&self) -> bool {
        self.ocr.is_some()
    }

    fn write_temp(pdf: &[u8]) -> Result<NamedTempFile, PdfError> {
        let mut file = tempfile::Builder::new()
            .prefix("prospectus-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(pdf)?;
        file.flush()?;
        Ok(file)
    }

    fn pdfinfo_pages(path: &Path) -> Result<usize, PdfError> {
        let output = Command::new("pdfinfo").arg(path).output();
        let stdout = handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed")?;
        stdout
            .lines()
            .find(|line| line.starts_with("Pages:"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PdfError::ToolFailed("pdfinfo reported no page count".to_string()))
    }

    fn run_pdftotext(path: &Path) -> Result<String, PdfError> {
        let output = Command::new("pdftotext")
            .args(["-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-") // Output to stdout
            .output();

        handle_cmd_output(output, "pdftotext (install poppler-utils)", "pdftotext failed")
    }
}

impl PdfEngine for PopplerEngine {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfError> {
        let file = Self::write_temp(pdf)?;
        Self::pdfinfo_pages(file.path())
    }

    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<PageText>, PdfError> {
        let file = Self::write_temp(pdf)?;
        let page_count = Self::pdfinfo_pages(file.path())?;
        let text = Self::run_pdftotext(file.path())?;

        let mut layer: Vec<&str> = text.split(FORM_FEED).take(page_count).collect();
        layer.resize(page_count, "");

        let mut pages = Vec::with_capacity(page_count);
        for (index, text) in layer.into_iter().enumerate() {
            if !text.trim().is_empty() {
                pages.push(PageText::new(index, text, ExtractionEngine::TextLayer));
                continue;
            }

            let ocr_text = match &self.ocr {
                Some(ocr) => match ocr.ocr_pdf_page(file.path(), index + 1) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!("OCR failed for page {}: {}", index + 1, e);
                        String::new()
                    }
                },
                None => String::new(),
            };

            if ocr_text.trim().is_empty() {
                pages.push(PageText::new(index, "", ExtractionEngine::Empty));
            } else {
                debug!("Page {} recovered by OCR", index + 1);
                pages.push(PageText::new(index, ocr_text, ExtractionEngine::Ocr));
            }
        }

        Ok(pages)
    }

    fn slice(&self, pdf: &[u8], start: usize, end: usize) -> Result<Vec<u8>, PdfError> {
        let file = Self::write_temp(pdf)?;
        let page_count = Self::pdfinfo_pages(file.path())?;
        if start > end || end >= page_count {
            return Err(PdfError::InvalidRange {
                start,
                end,
                page_count,
            });
        }

        let temp_dir = TempDir::new()?;
        let first = (start + 1).to_string();
        let last = (end + 1).to_string();
        let status = Command::new("pdfseparate")
            .args(["-f", &first, "-l", &last])
            .arg(file.path())
            .arg(temp_dir.path().join("page-%d.pdf"))
            .status();
        check_cmd_status(
            status,
            "pdfseparate (install poppler-utils)",
            "pdfseparate failed",
        )?;

        let output_path = temp_dir.path().join("slice.pdf");
        let mut unite = Command::new("pdfunite");
        for page in start + 1..=end + 1 {
            unite.arg(temp_dir.path().join(format!("page-{}.pdf", page)));
        }
        let status = unite.arg(&output_path).status();
        check_cmd_status(status, "pdfunite (install poppler-utils)", "pdfunite failed")?;

        Ok(std::fs::read(output_path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_ocr() {
        assert!(!PopplerEngine::without_ocr().has_ocr());
        assert!(PopplerEngine::with_ocr(TesseractOcr::default()).has_ocr());
    }

    #[test]
    fn test_garbage_is_rejected() {
        // pdfinfo fails on garbage; without poppler the tool is missing.
        let err = PopplerEngine::without_ocr()
            .page_count(b"not a pdf")
            .unwrap_err();
        assert!(matches!(
            err,
            PdfError::ToolFailed(_) | PdfError::ToolNotFound(_)
        ));
    }
}
