//! Condition-report span detection.
//!
//! Page features are computed once and shared by three layers tried in
//! order: anchor, aggressive keyword, scored block. The first layer that
//! produces a span wins.

mod aggressive;
mod anchor;
mod features;
mod scored;
mod toc;

pub use features::{has_strict_title, PageFeatures};
pub use toc::report_index_from_toc;

use tracing::{debug, info};

use crate::config::Thresholds;
use crate::models::{PageText, SpanResult};

/// Locate the condition report inside a bundle's page texts.
///
/// The returned range is inclusive, zero-based and always within the page
/// list.
pub fn detect_span(pages: &[PageText], thresholds: &Thresholds) -> Option<SpanResult> {
    if pages.is_empty() {
        return None;
    }

    let texts = || pages.iter().map(|p| p.text.as_str());
    let features = features::compute_all(texts(), thresholds.title_line_window);
    let toc = report_index_from_toc(texts(), pages.len(), thresholds.title_line_window);
    if let Some((toc_page, index)) = toc {
        debug!("Contents page {} maps the report to page {}", toc_page, index);
    }

    let span = anchor::detect(&features, toc.map(|(_, index)| index), thresholds)
        .or_else(|| aggressive::detect(&features, thresholds))
        .or_else(|| scored::detect(&features, thresholds));

    match &span {
        Some(span) => info!(
            "Report span {}..={} ({} pages) via {}",
            span.start,
            span.end,
            span.page_count(),
            span.method.as_str()
        ),
        None => info!("No report span in {} pages", pages.len()),
    }
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionEngine, SpanMethod};

    fn pages(texts: &[&str]) -> Vec<PageText> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| PageText::new(i, *t, ExtractionEngine::TextLayer))
            .collect()
    }

    #[test]
    fn test_empty_document() {
        assert!(detect_span(&[], &Thresholds::default()).is_none());
    }

    #[test]
    fn test_no_report_vocabulary() {
        let doc = pages(&["Salgsoppgave", "Om boligen", "Beliggenhet", "Prisantydning"]);
        assert!(detect_span(&doc, &Thresholds::default()).is_none());
    }

    #[test]
    fn test_toc_points_at_untitled_report() {
        let mut texts = vec![
            "Salgsoppgave\nStorgata 1",
            "Innhold\nOm boligen ..... 3\nTilstandsrapport ..... 4",
            "Om boligen\nBeliggenhet og adkomst",
        ];
        let report = "Storgata 1\nBefaring utført\nBaderom: TG 2 ved sluk\nDrenering TG 1";
        texts.extend(std::iter::repeat(report).take(5));
        texts.push("Energiattest\nEnergikarakter C");
        let span = detect_span(&pages(&texts), &Thresholds::default()).unwrap();
        assert_eq!(span.method, SpanMethod::Anchor);
        assert_eq!((span.start, span.end), (3, 7));
    }
}
