//! Strategies that turn a broker URL into validated PDF bytes.
//!
//! Each strategy declares which URLs it handles and how to fetch from
//! them. The registry holds them in a fixed priority order with one
//! catch-all strategy last; dispatch invokes the first match only.

pub mod browser;
mod candidates;
mod error;
mod generic;
pub mod http_client;
mod pipeline;
mod registry;
mod report_vendor;
mod sites;
mod verify;

pub use browser::{BrowserFallback, NoBrowser};
#[cfg(feature = "browser")]
pub use browser::BrowserHunter;
pub use candidates::{extract_raw_links, CandidateScanner, DocumentTarget, DOCUMENT_HOST_PATTERN};
pub use error::FetchError;
pub use generic::GenericStrategy;
pub use http_client::{HttpClient, HttpError};
pub use pipeline::{is_direct_document_url, DocumentHunt, RenderMode};
pub use registry::StrategyRegistry;
pub use report_vendor::ReportVendorStrategy;
pub use sites::{SiteProfile, SiteStrategy, SITE_PROFILES};
pub use verify::Verifier;

use async_trait::async_trait;
use url::Url;

use crate::config::Settings;
use crate::models::{BrokerPage, DebugMeta, FetchedDocument};

/// Call-scoped collaborators handed to every strategy.
pub struct FetchContext<'a> {
    pub client: &'a HttpClient,
    pub browser: &'a dyn BrowserFallback,
    pub settings: &'a Settings,
    /// Page fetched during discovery, reused when it is the dispatch URL.
    pub prefetched: Option<&'a BrokerPage>,
}

impl<'a> FetchContext<'a> {
    /// Prefetched page for `url`, if discovery already has it.
    pub fn prefetched_for(&self, url: &str) -> Option<&'a BrokerPage> {
        self.prefetched.filter(|page| page.url == url)
    }
}

/// A site-specific implementation of the discovery-and-fetch contract.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable name recorded in debug metadata.
    fn name(&self) -> &'static str;

    /// Whether this strategy handles `url`. Pure: no I/O.
    fn matches(&self, url: &Url) -> bool;

    /// Fetch the document behind `url`.
    async fn try_fetch(
        &self,
        ctx: &FetchContext<'_>,
        url: &str,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError>;
}

/// Whether `url`'s host is `domain` or a subdomain of it.
pub fn host_matches(url: &Url, domain: &str) -> bool {
    url.host_str()
        .map(|host| {
            let host = host.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_matches_subdomains() {
        let url = Url::parse("https://www.krogsveen.no/bolig/1").unwrap();
        assert!(host_matches(&url, "krogsveen.no"));
        let url = Url::parse("https://notkrogsveen.no/").unwrap();
        assert!(!host_matches(&url, "krogsveen.no"));
    }
}
