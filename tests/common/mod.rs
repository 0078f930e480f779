//! Shared fixtures: a fake PDF engine so span detection and persistence run
//! without poppler installed.
//!
//! A fake PDF is a `%PDF-` header followed by page texts separated by form
//! feeds.

#![allow(dead_code)]

use prospectus::models::{ExtractionEngine, PageText};
use prospectus::ocr::{PdfEngine, PdfError};

pub const HEADER: &[u8] = b"%PDF-1.7 fake\n";

/// Page texts of a prospectus bundle: four pages of sales material, an
/// eight-page condition report on pages 5-12 and a self-declaration form on
/// page 13.
pub const FILLER: &str =
    "Salgsoppgave\nStorgata 1, 0150 Oslo\nOm boligen\nBeliggenhet og adkomst\nSkoler og barnehager i gangavstand.";

pub const REPORT_TITLE_PAGE: &str = "Tilstandsrapport\nStorgata 1, 0150 Oslo\nBefaringsdato 01.02.2026\nUtført etter NS 3600 av bygningssakkyndig.";

pub const REPORT_BODY_PAGES: [&str; 7] = [
    "Våtrom\nBaderom i 2. etasje: TG 2 ved sluk.\nMembran ikke dokumentert.",
    "Elektrisk anlegg\nSikringsskap med automatsikringer. TG 1.",
    "Taktekking og takrenner\nTakkonstruksjon uten synlige avvik. TG 1.",
    "Drenering og grunnmur\nDrenering fra byggeår. TG 2.",
    "Vannledninger og avløpsrør\nAvløpsrør i støpejern. TG 2.",
    "Ventilasjon\nMekanisk avtrekk på bad. TG 1.",
    "Yttervegger\nVinduer og dører fra 2005. TG 1.",
];

pub const SELF_DECLARATION: &str =
    "Egenerklæringsskjema\nSelgers opplysninger om eiendommen\nSignert av selger.";

pub fn bundle_pages() -> Vec<&'static str> {
    let mut pages = vec![FILLER; 4];
    pages.push(REPORT_TITLE_PAGE);
    pages.extend(REPORT_BODY_PAGES);
    pages.push(SELF_DECLARATION);
    pages.extend(vec![FILLER; 7]);
    pages
}

pub fn fake_pdf(pages: &[&str]) -> Vec<u8> {
    let mut out = HEADER.to_vec();
    out.extend_from_slice(pages.join("\u{000C}").as_bytes());
    out
}

pub fn page_texts(pages: &[&str]) -> Vec<PageText> {
    pages
        .iter()
        .enumerate()
        .map(|(i, t)| PageText::new(i, *t, ExtractionEngine::TextLayer))
        .collect()
}

/// PDF engine over fake PDFs.
pub struct FakePdf;

impl FakePdf {
    fn pages(pdf: &[u8]) -> Result<Vec<String>, PdfError> {
        let body = pdf
            .strip_prefix(HEADER)
            .ok_or_else(|| PdfError::ToolFailed("not a fake pdf".to_string()))?;
        Ok(String::from_utf8_lossy(body)
            .split('\u{000C}')
            .map(str::to_string)
            .collect())
    }
}

impl PdfEngine for FakePdf {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfError> {
        Ok(Self::pages(pdf)?.len())
    }

    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<PageText>, PdfError> {
        Ok(Self::pages(pdf)?
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let engine = if text.trim().is_empty() {
                    ExtractionEngine::Empty
                } else {
                    ExtractionEngine::TextLayer
                };
                PageText::new(i, text, engine)
            })
            .collect())
    }

    fn slice(&self, pdf: &[u8], start: usize, end: usize) -> Result<Vec<u8>, PdfError> {
        let pages = Self::pages(pdf)?;
        if start > end || end >= pages.len() {
            return Err(PdfError::InvalidRange {
                start,
                end,
                page_count: pages.len(),
            });
        }
        let refs: Vec<&str> = pages[start..=end].iter().map(String::as_str).collect();
        Ok(fake_pdf(&refs))
    }
}
