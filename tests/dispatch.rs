//! Strategy registry ordering and first-match dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use prospectus::config::Settings;
use prospectus::models::{DebugMeta, FetchedDocument};
use prospectus::scrapers::{
    host_matches, FetchContext, FetchError, HttpClient, NoBrowser, Strategy, StrategyRegistry,
};
use url::Url;

/// Strategy that counts invocations and returns fixed bytes.
struct Counting {
    name: &'static str,
    domain: Option<&'static str>,
    bytes: Vec<u8>,
    calls: Arc<AtomicUsize>,
}

impl Counting {
    fn new(name: &'static str, domain: Option<&'static str>, bytes: &[u8]) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                domain,
                bytes: bytes.to_vec(),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl Strategy for Counting {
    fn name(&self) -> &'static str {
        self.name
    }

    fn matches(&self, url: &Url) -> bool {
        match self.domain {
            Some(domain) => host_matches(url, domain),
            None => true,
        }
    }

    async fn try_fetch(
        &self,
        _ctx: &FetchContext<'_>,
        url: &str,
        _debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchedDocument::new(self.bytes.clone(), url.to_string(), true))
    }
}

async fn dispatch(
    registry: &StrategyRegistry,
    url: &str,
) -> (Result<FetchedDocument, FetchError>, DebugMeta) {
    let settings = Settings::default();
    let client = HttpClient::from_settings(&settings).unwrap();
    let ctx = FetchContext {
        client: &client,
        browser: &NoBrowser,
        settings: &settings,
        prefetched: None,
    };
    let mut debug = DebugMeta::new();
    let result = registry.dispatch(&ctx, url, &mut debug).await;
    (result, debug)
}

#[tokio::test]
async fn test_only_first_match_is_invoked() {
    let (first, first_calls) = Counting::new("first", Some("megler.example"), b"%PDF-1");
    let (second, second_calls) = Counting::new("second", Some("megler.example"), b"%PDF-2");
    let (catch_all, catch_all_calls) = Counting::new("catch_all", None, b"%PDF-3");
    let registry = StrategyRegistry::new(vec![Box::new(first), Box::new(second)], Box::new(catch_all));

    let (result, debug) = dispatch(&registry, "https://www.megler.example/bolig/1").await;

    assert_eq!(result.unwrap().bytes, b"%PDF-1");
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert_eq!(catch_all_calls.load(Ordering::SeqCst), 0);
    assert_eq!(debug.get("strategy"), Some(&serde_json::json!("first")));
    assert_eq!(debug.current_step(), Some("strategy"));
}

#[tokio::test]
async fn test_catch_all_when_nothing_matches() {
    let (site, site_calls) = Counting::new("site", Some("megler.example"), b"%PDF-1");
    let (catch_all, catch_all_calls) = Counting::new("catch_all", None, b"%PDF-3");
    let registry = StrategyRegistry::new(vec![Box::new(site)], Box::new(catch_all));

    let (result, _) = dispatch(&registry, "https://annen-megler.example/bolig/1").await;

    assert_eq!(result.unwrap().bytes, b"%PDF-3");
    assert_eq!(site_calls.load(Ordering::SeqCst), 0);
    assert_eq!(catch_all_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_bytes_are_rejected() {
    let (catch_all, _) = Counting::new("catch_all", None, b"");
    let registry = StrategyRegistry::new(Vec::new(), Box::new(catch_all));

    let (result, _) = dispatch(&registry, "https://megler.example/").await;
    assert!(matches!(result, Err(FetchError::Validation { .. })));
}

#[tokio::test]
async fn test_invalid_url_invokes_nothing() {
    let (catch_all, calls) = Counting::new("catch_all", None, b"%PDF-3");
    let registry = StrategyRegistry::new(Vec::new(), Box::new(catch_all));

    let (result, _) = dispatch(&registry, "not a url").await;
    assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_builtin_order_is_fixed() {
    let registry = StrategyRegistry::builtin();
    let names = registry.names();
    assert_eq!(names.first(), Some(&"report_vendor"));
    assert_eq!(names.last(), Some(&"generic"));
    assert_eq!(names, StrategyRegistry::builtin().names());
}

#[test]
fn test_selection_is_pure_and_deterministic() {
    let registry = StrategyRegistry::builtin();
    let finn = Url::parse("https://www.finn.no/realestate/homes/ad.html?finnkode=412345678").unwrap();
    let vendor = Url::parse("https://www.tilstandsrapport.no/rapport/abc").unwrap();
    let unknown = Url::parse("https://ukjent-megler.example/bolig/1").unwrap();

    for _ in 0..3 {
        assert_eq!(registry.select(&finn).name(), "finn");
        assert_eq!(registry.select(&vendor).name(), "report_vendor");
        assert_eq!(registry.select(&unknown).name(), "generic");
    }
}
