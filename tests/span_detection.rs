//! Span detection over synthetic bundles.

mod common;

use common::{bundle_pages, page_texts, FILLER, REPORT_BODY_PAGES, REPORT_TITLE_PAGE};
use prospectus::config::Thresholds;
use prospectus::models::SpanMethod;
use prospectus::span::detect_span;

#[test]
fn test_anchor_layer_finds_titled_report() {
    let pages = page_texts(&bundle_pages());
    let span = detect_span(&pages, &Thresholds::default()).unwrap();

    assert_eq!((span.start, span.end), (4, 11));
    assert_eq!(span.method, SpanMethod::Anchor);
    assert_eq!(span.page_count(), 8);
}

#[test]
fn test_aggressive_layer_without_title() {
    let dense = "Storgata 1\nSammendrag\nDenne tilstandsrapporten er utarbeidet av bygningssakkyndig.\nTilstandsgrader er satt etter befaring.";
    let body = "Våtrom\nBaderom med TG 2 ved sluk.";
    let stop = "Energiattest\nEnergikarakter D, oppvarmingskarakter gul.";

    let mut texts = vec![FILLER; 8];
    texts.push(dense);
    texts.extend(vec![body; 11]);
    texts.push(stop);
    texts.extend(vec![FILLER; 4]);

    let span = detect_span(&page_texts(&texts), &Thresholds::default()).unwrap();
    assert_eq!(span.method, SpanMethod::AggressiveKeyword);
    assert_eq!((span.start, span.end), (8, 19));
}

#[test]
fn test_broker_footer_does_not_extend_the_report() {
    let footer = format!("{}\nOppdragsnummer 1-0123/24", FILLER);
    let mut texts: Vec<&str> = vec![footer.as_str(); 4];
    texts.push(REPORT_TITLE_PAGE);
    texts.extend(REPORT_BODY_PAGES);
    texts.extend(vec![footer.as_str(); 10]);

    let span = detect_span(&page_texts(&texts), &Thresholds::default()).unwrap();
    assert_eq!(span.method, SpanMethod::Anchor);
    assert_eq!((span.start, span.end), (4, 11));
}

#[test]
fn test_aggressive_layer_ignores_self_declaration_mention_in_report() {
    let dense = "Storgata 1\nSammendrag\nDenne tilstandsrapporten er utarbeidet av bygningssakkyndig.\nTilstandsgrader er satt etter befaring.";
    let mention = "Tilstandsrapporten bygger på befaring. Selgers egenerklæring er gjennomgått.";
    let body = "Våtrom\nBaderom med TG 2 ved sluk.";
    let stop = "Energiattest\nEnergikarakter D, oppvarmingskarakter gul.";

    let mut texts = vec![FILLER; 8];
    texts.push(dense);
    texts.push(mention);
    texts.extend(vec![body; 10]);
    texts.push(stop);
    texts.extend(vec![FILLER; 4]);

    let span = detect_span(&page_texts(&texts), &Thresholds::default()).unwrap();
    assert_eq!(span.method, SpanMethod::AggressiveKeyword);
    assert_eq!((span.start, span.end), (8, 19));
}

#[test]
fn test_aggressive_layer_rejects_oversized_window() {
    let dense = "Storgata 1\nDenne tilstandsrapporten bygger på befaring og tilstandsgrader.";
    let mut texts = vec![FILLER; 2];
    texts.push(dense);
    texts.extend(vec![FILLER; 50]);

    // No hard stop: the window runs to the last page and exceeds the maximum
    let thresholds = Thresholds {
        max_aggressive_window: 40,
        ..Default::default()
    };
    assert!(detect_span(&page_texts(&texts), &thresholds).is_none());
}

#[test]
fn test_scored_block_fallback() {
    let weak = "Befaring av baderom, TG 2.";
    let mut texts = vec![FILLER; 3];
    texts.extend(vec![weak; 4]);
    texts.extend(vec![FILLER; 5]);

    let span = detect_span(&page_texts(&texts), &Thresholds::default()).unwrap();
    assert_eq!(span.method, SpanMethod::ScoredBlock);
    assert_eq!((span.start, span.end), (3, 6));
}

#[test]
fn test_span_stays_within_document() {
    let mut texts = bundle_pages();
    texts.truncate(10);
    let span = detect_span(&page_texts(&texts), &Thresholds::default()).unwrap();
    assert!(span.start <= span.end);
    assert!(span.end < texts.len());
    assert_eq!((span.start, span.end), (4, 9));
}

#[test]
fn test_plain_prospectus_has_no_span() {
    let texts = vec![FILLER; 12];
    assert!(detect_span(&page_texts(&texts), &Thresholds::default()).is_none());
}
