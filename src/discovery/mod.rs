//! Listing-page discovery: find the broker URL behind a listing.
//!
//! The listing page (typically a finn.no ad) links to the broker's own
//! page for the full prospectus. When no such link is found the listing
//! URL itself is handed to the strategies.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::models::{BrokerPage, DebugMeta};
use crate::scrapers::HttpClient;
use crate::utils::{has_document_extension, host_of, resolve_url, DISCOVERY_LINK_CUE, PROSPECTUS_LEXICON};

/// Outcome of discovery.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Broker URL to dispatch on; the listing URL when no link was found.
    pub resolved_url: String,
    /// Listing page, when it could be fetched.
    pub listing_page: Option<BrokerPage>,
}

impl Resolution {
    /// Whether discovery fell back to the listing URL itself.
    pub fn is_listing_fallback(&self, listing_url: &str) -> bool {
        self.resolved_url == listing_url
    }

    /// Page already fetched for the resolved URL, if any.
    pub fn prefetched_page(&self) -> Option<&BrokerPage> {
        self.listing_page
            .as_ref()
            .filter(|page| page.url == self.resolved_url)
    }
}

/// Fetch the listing page and resolve the broker link.
///
/// Never fails: a fetch error degrades to the listing URL.
pub async fn resolve(client: &HttpClient, listing_url: &str, debug: &mut DebugMeta) -> Resolution {
    debug.step("discovery");

    let html = match client.get_text(listing_url).await {
        Ok((html, _final_url)) => html,
        Err(e) => {
            warn!("Listing page fetch failed for {}: {}", listing_url, e);
            debug.set("discovery", "listing_fetch_failed");
            debug.set("discovery_error", e.to_string());
            return Resolution {
                resolved_url: listing_url.to_string(),
                listing_page: None,
            };
        }
    };

    let resolution = resolve_from_html(listing_url, &html);
    if resolution.is_listing_fallback(listing_url) {
        debug.set("discovery", "listing_fallback");
    } else {
        info!("Discovered broker link {}", resolution.resolved_url);
        debug.set("discovery", "explicit_link");
    }
    debug.set("resolved_url", resolution.resolved_url.clone());
    resolution
}

/// Resolve from an already-fetched listing page.
pub fn resolve_from_html(listing_url: &str, html: &str) -> Resolution {
    let resolved_url =
        find_broker_link(listing_url, html).unwrap_or_else(|| listing_url.to_string());
    Resolution {
        resolved_url,
        listing_page: Some(BrokerPage {
            url: listing_url.to_string(),
            html: html.to_string(),
        }),
    }
}

/// Find the best explicit "full prospectus" link on a listing page.
pub fn find_broker_link(listing_url: &str, html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").ok()?;
    let listing_host = host_of(listing_url);

    let mut best: Option<(i32, String)> = None;

    for element in document.select(&selector) {
        let text = link_text(&element);
        if !DISCOVERY_LINK_CUE.is_match(&text) {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_url(listing_url, href) else {
            continue;
        };
        if url == listing_url || PROSPECTUS_LEXICON.is_negative(&text) {
            continue;
        }

        let mut score = 1;
        if host_of(&url) != listing_host {
            score += 2;
        }
        if has_document_extension(&url) {
            score += 1;
        }
        debug!("Discovery link candidate {} ({:?}) score {}", url, text, score);

        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, url));
        }
    }

    best.map(|(_, url)| url)
}

/// Visible text plus title and aria-label attributes.
fn link_text(element: &ElementRef) -> String {
    let mut parts: Vec<String> = vec![element.text().collect::<Vec<_>>().join(" ")];
    for attr in ["title", "aria-label"] {
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

    const LISTING: &str = "https://www.finn.no/realestate/homes/ad.html?finnkode=312345678";

    #[test]
    fn test_no_link_falls_back_to_listing_url() {
        let html = r#"<html><body><a href="/kontakt">Kontakt megler</a></body></html>"#;
        let resolution = resolve_from_html(LISTING, html);
        assert_eq!(resolution.resolved_url, LISTING);
        assert!(resolution.is_listing_fallback(LISTING));
        assert!(resolution.prefetched_page().is_some());
    }

    #[test]
    fn test_explicit_link_is_resolved_absolute() {
        let html = r#"<a href="https://www.krogsveen.no/kjope/boliger-til-salgs/123456">Se komplett salgsoppgave</a>"#;
        let resolution = resolve_from_html(LISTING, html);
        assert_eq!(
            resolution.resolved_url,
            "https://www.krogsveen.no/kjope/boliger-til-salgs/123456"
        );
        assert!(resolution.prefetched_page().is_none());
    }

    #[test]
    fn test_relative_link_and_aria_label() {
        let html = r#"<a href="/salgsoppgave/312345678" aria-label="Last ned salgsoppgave"><span></span></a>"#;
        assert_eq!(
            find_broker_link(LISTING, html).as_deref(),
            Some("https://www.finn.no/salgsoppgave/312345678")
        );
    }

    #[test]
    fn test_combined_prospectus_and_report_link_is_kept() {
        let html = r#"<a href="https://megler.example/bolig/1/salgsoppgave">Se komplett salgsoppgave og tilstandsrapport</a>"#;
        assert_eq!(
            find_broker_link(LISTING, html).as_deref(),
            Some("https://megler.example/bolig/1/salgsoppgave")
        );
    }

    #[test]
    fn test_off_site_link_preferred() {
        let html = r#"
            <a href="/salgsoppgave/1">Se salgsoppgave</a>
            <a href="https://megler.example/bolig/1">Mer info hos megler</a>
        "#;
        assert_eq!(
            find_broker_link(LISTING, html).as_deref(),
            Some("https://megler.example/bolig/1")
        );
    }
}
