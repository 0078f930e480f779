//! Tesseract OCR for image-only pages.
//!
//! Renders one PDF page with pdftoppm and runs Tesseract on the image.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use super::tools::{check_binary, check_cmd_status, handle_cmd_output};
use super::PdfError;

/// Norwegian first, English for vendor templates.
pub const DEFAULT_LANGUAGE: &str = "nor+eng";

/// Tesseract OCR runner.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    dpi: u32,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            dpi: 300,
        }
    }
}

impl TesseractOcr {
    /// Tesseract when both `tesseract` and `pdftoppm` are installed.
    pub fn detect() -> Option<Self> {
        Self::is_available().then(Self::default)
    }

    pub fn is_available() -> bool {
        check_binary("tesseract") && check_binary("pdftoppm")
    }

    /// Set Tesseract language.
    pub fn with_language(mut self, lang: &str) -> Self {
        self.language = lang.to_string();
        self
    }

    /// OCR one page (one-based) of a PDF file.
    pub fn ocr_pdf_page(&self, pdf_path: &Path, page: usize) -> Result<String, PdfError> {
        let temp_dir = TempDir::new()?;
        let image_path = self.pdf_page_to_image(pdf_path, page, temp_dir.path())?;
        self.run_tesseract(&image_path)
    }

    fn run_tesseract(&self, image_path: &Path) -> Result<String, PdfError> {
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output();

        handle_cmd_output(output, "tesseract (install tesseract-ocr)", "tesseract failed")
    }

    fn pdf_page_to_image(
        &self,
        pdf_path: &Path,
        page: usize,
        output_dir: &Path,
    ) -> Result<PathBuf, PdfError> {
        let page_str = page.to_string();
        let dpi = self.dpi.to_string();
        let status = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi, "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(output_dir.join("page"))
            .status();

        check_cmd_status(
            status,
            "pdftoppm (install poppler-utils)",
            &format!("pdftoppm failed to convert page {}", page),
        )?;

        find_page_image(output_dir, page)
            .ok_or_else(|| PdfError::ToolFailed(format!("No image generated for page {}", page)))
    }
}

/// pdftoppm zero-pads page numbers to the width of the document's page count.
fn find_page_image(dir: &Path, page: usize) -> Option<PathBuf> {
    (1..=4)
        .map(|digits| dir.join(format!("page-{:0width$}.png", page, width = digits)))
        .find(|path| path.exists())
}
