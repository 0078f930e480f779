//! Shared utility functions.
//!
//! This module contains reusable utilities used across the codebase:
//! - `lexicon`: positive/negative keyword lexicons shared by every strategy
//! - `mime`: content-type and magic-byte validation of document payloads
//! - `url`: relative URL resolution and document-URL heuristics

pub mod lexicon;
mod mime;
mod url;

pub use lexicon::{Lexicon, DISCOVERY_LINK_CUE, PROSPECTUS_LEXICON, REPORT_LEXICON};
pub use mime::{
    content_type_is_html, content_type_is_pdf, has_pdf_magic, looks_like_html, validate_pdf_payload,
    PayloadVerdict,
};
pub use url::{decoded_lowercase, has_document_extension, host_of, resolve_url};
