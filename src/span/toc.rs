//! Table-of-contents mapping of the report title to a page index.

use std::sync::LazyLock;

use regex::Regex;

use super::features::has_index_heading;

/// A contents line naming the report followed by a printed page number.
static TOC_REPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^\s*(?:\d+[.)]?\s+)?(?:tilstandsrapport|boligsalgsrapport|takstrapport)\b[^\n]*?[\s.·…_-]+(\d{1,3})\s*$",
    )
    .expect("toc pattern")
});

/// Find the zero-based index the contents page assigns to the report.
///
/// Printed page numbers are one-based. A mapping that points at or before
/// the contents page itself, or past the end of the document, is ignored.
pub fn report_index_from_toc<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    page_count: usize,
    title_line_window: usize,
) -> Option<(usize, usize)> {
    for (toc_index, text) in texts.into_iter().enumerate() {
        if !has_index_heading(text, title_line_window) {
            continue;
        }
        for caps in TOC_REPORT_LINE.captures_iter(text) {
            let Some(printed) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
                continue;
            };
            if printed == 0 {
                continue;
            }
            let index = printed - 1;
            if index > toc_index && index < page_count {
                return Some((toc_index, index));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_leader() {
        let pages = [
            "Salgsoppgave",
            "Innhold\nOm boligen ........ 3\nTilstandsrapport ........ 9\nVedlegg ..... 20",
        ];
        assert_eq!(report_index_from_toc(pages, 30, 10), Some((1, 8)));
    }

    #[test]
    fn test_numbered_entry_with_spaces() {
        let pages = ["Innhold\n1. Nøkkelinfo   2\n4. Tilstandsrapport   12"];
        assert_eq!(report_index_from_toc(pages, 20, 10), Some((0, 11)));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let pages = ["Innhold\nTilstandsrapport ..... 99"];
        assert_eq!(report_index_from_toc(pages, 20, 10), None);
    }

    #[test]
    fn test_requires_index_heading() {
        let pages = ["Om boligen\nTilstandsrapport ..... 5"];
        assert_eq!(report_index_from_toc(pages, 20, 10), None);
    }
}
