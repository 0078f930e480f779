//! Candidate scanning: find, filter, score and rank document links in a
//! broker page.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::models::DocumentCandidate;
use crate::utils::{decoded_lowercase, has_document_extension, resolve_url, Lexicon};
use crate::utils::{PROSPECTUS_LEXICON, REPORT_LEXICON};

/// Which document a strategy is hunting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentTarget {
    /// The full sale prospectus.
    Prospectus,
    /// The condition report on its own.
    ConditionReport,
}

impl DocumentTarget {
    pub fn lexicon(&self) -> &'static Lexicon {
        match self {
            Self::Prospectus => &PROSPECTUS_LEXICON,
            Self::ConditionReport => &REPORT_LEXICON,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prospectus => "prospectus",
            Self::ConditionReport => "condition_report",
        }
    }
}

/// URL shapes typical of broker document endpoints.
pub static DOCUMENT_HOST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)/(dokument|dokumenter|document|documents|download|nedlasting|files?|attachments?|vedlegg|getdocument|getfile)(/|\?|$)|webmegler|vitecnext|vitec|nhosting|blob\.core\.windows\.net|cloudfront\.net/.+\.pdf",
    )
    .expect("document host pattern")
});

/// Absolute URLs inside script bodies.
static SCRIPT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>\\)]+"#).expect("script url pattern"));

/// Quoted relative paths to PDFs inside script bodies.
static SCRIPT_RELATIVE_PDF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'](/[^"'\s<>]+\.pdf(\?[^"'\s<>]*)?)["']"#).expect("relative pdf pattern")
});

const LABEL_WEIGHT: i32 = 3;
const URL_WEIGHT: i32 = 2;
const EXTENSION_BONUS: i32 = 5;
const DOCUMENT_HOST_BONUS: i32 = 2;
const HINT_BONUS: i32 = 4;

/// Object keys whose string value labels a JSON-embedded link.
const JSON_LABEL_KEYS: &[&str] = &["name", "title", "label", "type", "description", "fileName", "filename"];

/// Scans broker-page HTML for document candidates.
pub struct CandidateScanner<'a> {
    target: DocumentTarget,
    hints: &'a [Regex],
}

impl<'a> CandidateScanner<'a> {
    pub fn new(target: DocumentTarget) -> Self {
        Self { target, hints: &[] }
    }

    /// Site-specific URL patterns that earn a bonus.
    pub fn with_hints(mut self, hints: &'a [Regex]) -> Self {
        self.hints = hints;
        self
    }

    /// Extract, filter, score and rank every candidate on the page.
    ///
    /// Negative-lexicon matches are dropped; candidates with no positive
    /// signal at all are dropped; duplicates keep their best score.
    pub fn scan(&self, page_url: &str, html: &str) -> Vec<DocumentCandidate> {
        let raw = extract_raw_links(page_url, html);
        self.rank(raw)
    }

    /// Filter, score and rank pre-extracted `(url, label)` pairs.
    pub fn rank(&self, raw: Vec<(String, String)>) -> Vec<DocumentCandidate> {
        let lexicon = self.target.lexicon();
        let mut order: Vec<String> = Vec::new();
        let mut best: HashMap<String, DocumentCandidate> = HashMap::new();

        for (url, label) in raw {
            let url_text = decoded_lowercase(&url);
            if lexicon.is_negative(&url_text) || lexicon.is_negative(&label) {
                debug!("Rejected candidate {} ({:?}): negative lexicon", url, label);
                continue;
            }

            let score = self.score(&url, &url_text, &label);
            if score <= 0 {
                continue;
            }

            match best.get_mut(&url) {
                Some(existing) => {
                    if score > existing.score {
                        existing.score = score;
                    }
                    if existing.label.is_empty() && !label.is_empty() {
                        existing.label = label;
                    }
                }
                None => {
                    order.push(url.clone());
                    best.insert(url.clone(), DocumentCandidate { url, label, score });
                }
            }
        }

        let mut ranked: Vec<DocumentCandidate> = order
            .into_iter()
            .filter_map(|url| best.remove(&url))
            .collect();
        // Stable: equal scores keep page order
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    fn score(&self, url: &str, url_text: &str, label: &str) -> i32 {
        let lexicon = self.target.lexicon();
        let mut score = LABEL_WEIGHT * lexicon.positive_hits(label) as i32
            + URL_WEIGHT * lexicon.positive_hits(url_text) as i32;

        if has_document_extension(url) {
            score += EXTENSION_BONUS;
        }
        if DOCUMENT_HOST_PATTERN.is_match(url) {
            score += DOCUMENT_HOST_BONUS;
        }
        if self.hints.iter().any(|h| h.is_match(url)) {
            score += HINT_BONUS;
        }
        score
    }
}

/// Every `(absolute url, label)` pair the page exposes.
pub fn extract_raw_links(page_url: &str, html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let mut links: Vec<(String, String)> = Vec::new();

    let mut push = |href: &str, label: String| {
        if let Some(url) = resolve_url(page_url, href) {
            links.push((url, label));
        }
    };

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if let Some(href) = element.value().attr("href") {
                push(href, element_label(&element));
            }
        }
    }

    for (css, attr) in [
        ("iframe[src]", "src"),
        ("embed[src]", "src"),
        ("object[data]", "data"),
        ("[data-href]", "data-href"),
        ("[data-url]", "data-url"),
        ("[data-file]", "data-file"),
        ("[data-pdf]", "data-pdf"),
    ] {
        if let Ok(selector) = Selector::parse(css) {
            for element in document.select(&selector) {
                if let Some(href) = element.value().attr(attr) {
                    push(href, element_label(&element));
                }
            }
        }
    }

    if let Ok(selector) = Selector::parse("script") {
        for element in document.select(&selector) {
            let body: String = element.text().collect();
            if body.trim().is_empty() {
                continue;
            }

            let script_type = element.value().attr("type").unwrap_or("");
            let is_json = script_type.contains("json") || element.value().id() == Some("__NEXT_DATA__");

            if is_json {
                if let Ok(value) = serde_json::from_str::<Value>(&body) {
                    let mut found = Vec::new();
                    walk_json(&value, "", &mut found);
                    for (href, label) in found {
                        push(&href, label);
                    }
                    continue;
                }
            }

            let unescaped = body.replace("\\/", "/").replace("\\u002F", "/");
            for m in SCRIPT_URL.find_iter(&unescaped) {
                push(m.as_str(), String::new());
            }
            for caps in SCRIPT_RELATIVE_PDF.captures_iter(&unescaped) {
                if let Some(path) = caps.get(1) {
                    push(path.as_str(), String::new());
                }
            }
        }
    }

    links
}

/// Collect URL-valued strings from embedded JSON, labelled by sibling
/// name/title fields when present, else by their key.
fn walk_json(value: &Value, label: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            let own_label = JSON_LABEL_KEYS
                .iter()
                .filter_map(|k| map.get(*k).and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            for (key, child) in map {
                let child_label = if own_label.is_empty() {
                    key.clone()
                } else {
                    own_label.clone()
                };
                walk_json(child, &child_label, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_json(item, label, out);
            }
        }
        Value::String(s) => {
            let s = s.trim();
            let looks_like_url = s.starts_with("http://")
                || s.starts_with("https://")
                || (s.starts_with('/') && has_document_extension(s));
            if looks_like_url {
                out.push((s.to_string(), label.to_string()));
            }
        }
        _ => {}
    }
}

/// Visible text plus descriptive attributes, whitespace-normalised.
fn element_label(element: &ElementRef) -> String {
    let mut parts: Vec<String> = vec![element.text().collect::<Vec<_>>().join(" ")];
    for attr in ["title", "aria-label", "download", "alt"] {
        if let Some(value) = element.value().attr(attr) {
            parts.push(value.to_string());
        }
    }
    parts
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://megler.example/bolig/12345678";

    #[test]
    fn test_negative_link_is_dropped_positive_kept() {
        let html = r#"
            <a href="/docs/energiattest.pdf">Energiattest</a>
            <a href="/docs/salgsoppgave-storgata-1.pdf">Last ned salgsoppgave</a>
        "#;
        let ranked = CandidateScanner::new(DocumentTarget::Prospectus).scan(PAGE, html);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].url, "https://megler.example/docs/salgsoppgave-storgata-1.pdf");
    }

    #[test]
    fn test_combined_bundle_link_is_a_candidate() {
        let html = r#"
            <a href="/docs/tilstandsrapport.pdf">Tilstandsrapport</a>
            <a href="/docs/salgsoppgave-med-tilstandsrapport.pdf">Komplett salgsoppgave med tilstandsrapport</a>
        "#;
        let ranked = CandidateScanner::new(DocumentTarget::Prospectus).scan(PAGE, html);
        assert_eq!(ranked.len(), 1);
        assert_eq!(
            ranked[0].url,
            "https://megler.example/docs/salgsoppgave-med-tilstandsrapport.pdf"
        );
    }

    #[test]
    fn test_ranking_prefers_positive_label_and_extension() {
        let html = r#"
            <a href="/docs/a.pdf">Plantegning</a>
            <a href="/docs/b.pdf">Komplett salgsoppgave</a>
        "#;
        let ranked = CandidateScanner::new(DocumentTarget::Prospectus).scan(PAGE, html);
        assert_eq!(ranked[0].url, "https://megler.example/docs/b.pdf");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_plain_navigation_links_are_not_candidates() {
        let html = r#"<a href="/om-oss">Om oss</a><a href="/kontakt">Kontakt</a>"#;
        assert!(CandidateScanner::new(DocumentTarget::Prospectus)
            .scan(PAGE, html)
            .is_empty());
    }

    #[test]
    fn test_duplicates_keep_best_score() {
        let html = r#"
            <a href="/docs/b.pdf"></a>
            <a href="/docs/b.pdf">Salgsoppgave</a>
        "#;
        let ranked = CandidateScanner::new(DocumentTarget::Prospectus).scan(PAGE, html);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].label, "Salgsoppgave");
        assert_eq!(ranked[0].score, EXTENSION_BONUS + LABEL_WEIGHT);
    }

    #[test]
    fn test_script_and_iframe_urls_are_harvested() {
        let html = r#"
            <iframe src="https://viewer.example/dokument/salgsoppgave.pdf"></iframe>
            <script>window.cfg = {"pdf":"https:\/\/cdn.example\/files\/prospekt.pdf"};</script>
        "#;
        let ranked = CandidateScanner::new(DocumentTarget::Prospectus).scan(PAGE, html);
        let urls: Vec<&str> = ranked.iter().map(|c| c.url.as_str()).collect();
        assert!(urls.contains(&"https://viewer.example/dokument/salgsoppgave.pdf"));
        assert!(urls.contains(&"https://cdn.example/files/prospekt.pdf"));
    }

    #[test]
    fn test_next_data_json_is_walked() {
        let html = r#"
            <script id="__NEXT_DATA__" type="application/json">
            {"props":{"documents":[
                {"name":"Salgsoppgave","url":"/api/documents/991.pdf"},
                {"name":"Nabolagsprofil","url":"/api/documents/992.pdf"}
            ]}}
            </script>
        "#;
        let ranked = CandidateScanner::new(DocumentTarget::Prospectus).scan(PAGE, html);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].url, "https://megler.example/api/documents/991.pdf");
        assert_eq!(ranked[0].label, "Salgsoppgave");
    }

    #[test]
    fn test_report_target_accepts_report_links() {
        let html = r#"
            <a href="/docs/tilstandsrapport.pdf">Tilstandsrapport</a>
            <a href="/docs/budskjema.pdf">Budskjema</a>
        "#;
        let ranked = CandidateScanner::new(DocumentTarget::ConditionReport).scan(PAGE, html);
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0].url.ends_with("tilstandsrapport.pdf"));
    }

    #[test]
    fn test_hint_bonus() {
        let hints = vec![Regex::new(r"/api/prospect/").unwrap()];
        let raw = vec![
            ("https://m.example/files/x.pdf".to_string(), String::new()),
            ("https://m.example/api/prospect/x".to_string(), String::new()),
        ];
        let ranked = CandidateScanner::new(DocumentTarget::Prospectus)
            .with_hints(&hints)
            .rank(raw);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].url, "https://m.example/files/x.pdf");
        assert_eq!(ranked[1].score, HINT_BONUS);
    }
}
