//! Payload validation: content-type header and leading magic bytes.
//!
//! Both checks exist because either can be wrong on a given server: some
//! brokers serve PDFs as `application/octet-stream`, others answer a PDF
//! URL with an HTML error page labelled `application/pdf`.

/// PDF header marker.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// The PDF header may be preceded by up to this many bytes of junk.
const MAGIC_SCAN_WINDOW: usize = 1024;

/// Outcome of validating a downloaded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadVerdict {
    /// Body is a PDF; `content_type_confirmed` says whether the header agreed.
    Pdf { content_type_confirmed: bool },
    /// Body is empty.
    Empty,
    /// Body is an HTML page.
    Html,
    /// Body is something else.
    NotPdf,
}

impl PayloadVerdict {
    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf { .. })
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Pdf { .. } => "pdf",
            Self::Empty => "empty_body",
            Self::Html => "html_body",
            Self::NotPdf => "not_pdf",
        }
    }
}

/// Whether a Content-Type header denotes a PDF.
pub fn content_type_is_pdf(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("application/pdf") || ct.contains("application/x-pdf")
        })
        .unwrap_or(false)
}

/// Whether a Content-Type header denotes HTML.
pub fn content_type_is_html(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        })
        .unwrap_or(false)
}

/// Whether the body carries the PDF header within its first kilobyte.
pub fn has_pdf_magic(body: &[u8]) -> bool {
    if infer::get(body).is_some_and(|kind| kind.mime_type() == "application/pdf") {
        return true;
    }
    let window = &body[..body.len().min(MAGIC_SCAN_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Whether the body starts like an HTML document.
pub fn looks_like_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();
    trimmed.starts_with("<!doctype html") || trimmed.starts_with("<html") || trimmed.starts_with("<head")
}

/// Decide whether a downloaded body is a PDF.
///
/// Accepted when the magic bytes are present, or when the header says PDF
/// and the body is non-empty and not HTML.
pub fn validate_pdf_payload(content_type: Option<&str>, body: &[u8]) -> PayloadVerdict {
    if body.is_empty() {
        return PayloadVerdict::Empty;
    }

    let header_says_pdf = content_type_is_pdf(content_type);

    if has_pdf_magic(body) {
        return PayloadVerdict::Pdf {
            content_type_confirmed: header_says_pdf,
        };
    }

    if looks_like_html(body) {
        return PayloadVerdict::Html;
    }

    if header_says_pdf {
        return PayloadVerdict::Pdf {
            content_type_confirmed: true,
        };
    }

    PayloadVerdict::NotPdf
}
