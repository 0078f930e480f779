//! Acquisition pipeline: discovery, strategy dispatch, persistence.
//!
//! One `acquire_*` call is one sequential pipeline with its own debug
//! metadata; nothing mutable is shared between concurrent calls.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::Settings;
use crate::discovery;
use crate::models::{DebugMeta, FailCase, FetchedDocument, ListingReference};
use crate::ocr::{self, PdfEngine, PdfError, PopplerEngine};
use crate::scrapers::{
    BrowserFallback, FetchContext, FetchError, HttpClient, HttpError, NoBrowser, StrategyRegistry,
};
use crate::storage::{
    network_diagnostics, FailcaseRecorder, PersistOutcome, Persistence, StorageError,
};

/// Terminal acquisition failures. Every variant carries the debug metadata
/// accumulated up to the failure; `debug["step"]` is the user-facing reason.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("No strategy produced a validated document: {source}")]
    TotalFailure {
        #[source]
        source: FetchError,
        debug: DebugMeta,
    },

    #[error("Acquisition exceeded its {after:?} deadline")]
    Deadline { after: Duration, debug: DebugMeta },

    #[error("Unexpected failure: {message}")]
    Unexpected { message: String, debug: DebugMeta },
}

impl AcquireError {
    pub fn debug(&self) -> &DebugMeta {
        match self {
            Self::TotalFailure { debug, .. }
            | Self::Deadline { debug, .. }
            | Self::Unexpected { debug, .. } => debug,
        }
    }

    /// Pipeline stage reached when the failure happened.
    pub fn step(&self) -> Option<&str> {
        self.debug().current_step()
    }

    /// Failcase label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TotalFailure { .. } => "total_failure",
            Self::Deadline { .. } => "deadline",
            Self::Unexpected { .. } => "unexpected",
        }
    }
}

/// Validated bytes and how they were found.
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub listing: ListingReference,
    pub bytes: Vec<u8>,
    pub source_url: String,
    pub debug: DebugMeta,
}

/// Browser capability for these settings: the chromium hunter when compiled
/// in and enabled, otherwise a no-op.
pub fn default_browser(settings: &Settings) -> Arc<dyn BrowserFallback> {
    #[cfg(feature = "browser")]
    {
        if settings.browser.enabled {
            return Arc::new(crate::scrapers::BrowserHunter::from_settings(settings));
        }
    }
    #[cfg(not(feature = "browser"))]
    let _ = settings;
    Arc::new(NoBrowser)
}

/// Long-lived acquisition service. Cheap to share behind an `Arc`.
pub struct Acquirer {
    settings: Settings,
    client: HttpClient,
    registry: StrategyRegistry,
    browser: Arc<dyn BrowserFallback>,
    engine: Arc<dyn PdfEngine>,
    failcases: FailcaseRecorder,
}

impl Acquirer {
    pub fn new(settings: Settings) -> Result<Self, HttpError> {
        let client = HttpClient::from_settings(&settings)?;
        let browser = default_browser(&settings);
        let failcases = FailcaseRecorder::new(settings.failcases_dir());
        Ok(Self {
            settings,
            client,
            registry: StrategyRegistry::builtin(),
            browser,
            engine: Arc::new(PopplerEngine::new()),
            failcases,
        })
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserFallback>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn PdfEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Whole-document text, for downstream analysis.
    pub fn extract_text(&self, pdf: &[u8]) -> Result<String, PdfError> {
        ocr::extract_text(self.engine.as_ref(), pdf)
    }

    /// Turn a listing URL into validated prospectus bytes.
    pub async fn acquire_prospectus(&self, listing_url: &str) -> Result<Acquisition, AcquireError> {
        let deadline = Instant::now() + self.settings.overall_deadline();
        self.acquire_until(listing_url, deadline).await
    }

    /// Acquire, then run the persistence gate. The returned acquisition
    /// holds the bytes the gate chose: the isolated report when
    /// `prefer_isolated` is set and one survived, otherwise the bundle.
    ///
    /// The gate runs on a blocking thread that cannot be cancelled. On
    /// `Deadline` it may still be finishing an in-flight poppler call, but
    /// it writes no new artifact after the deadline; a bundle written
    /// before it stays on disk.
    pub async fn acquire_and_persist(
        &self,
        listing_url: &str,
        prefer_isolated: bool,
    ) -> Result<(Acquisition, PersistOutcome), AcquireError> {
        let deadline = Instant::now() + self.settings.overall_deadline();
        let mut acquisition = self.acquire_until(listing_url, deadline).await?;

        let settings = self.settings.clone();
        let engine = Arc::clone(&self.engine);
        let code = acquisition.listing.listing_code.clone();
        let bytes = std::mem::take(&mut acquisition.bytes);
        let source_url = acquisition.source_url.clone();
        let mut debug = acquisition.debug.clone();

        // Persistence shells out to poppler; keep it off the async workers.
        let std_deadline = deadline.into_std();
        let task = tokio::task::spawn_blocking(move || {
            let gate = Persistence::new(&settings, engine.as_ref()).with_deadline(std_deadline);
            let result = gate.persist(&code, &bytes, &source_url, prefer_isolated, &mut debug);
            (result, debug)
        });

        let (result, debug) = match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(joined)) => joined,
            Ok(Err(join_error)) => {
                let message = format!("persistence task failed: {}", join_error);
                return Err(self
                    .fail_unexpected(&acquisition.listing, message, acquisition.debug)
                    .await);
            }
            Err(_) => {
                let mut debug = acquisition.debug;
                debug.step("persist");
                return Err(self.fail_deadline(&acquisition.listing, debug).await);
            }
        };

        match result {
            Ok(outcome) => {
                acquisition.bytes = outcome.bytes.clone();
                acquisition.debug = debug;
                Ok((acquisition, outcome))
            }
            Err(StorageError::DeadlinePassed(_)) => {
                let mut debug = debug;
                debug.step("persist");
                Err(self.fail_deadline(&acquisition.listing, debug).await)
            }
            Err(e) => Err(self
                .fail_unexpected(&acquisition.listing, e.to_string(), debug)
                .await),
        }
    }

    async fn acquire_until(
        &self,
        listing_url: &str,
        deadline: Instant,
    ) -> Result<Acquisition, AcquireError> {
        let listing = ListingReference::from_url(listing_url);
        let mut debug = DebugMeta::new();
        debug.set("listing_url", listing.listing_url.clone());
        debug.set("listing_code", listing.listing_code.clone());
        info!(
            "Acquiring prospectus for listing {} ({})",
            listing.listing_code, listing.listing_url
        );

        let outcome =
            tokio::time::timeout_at(deadline, self.run_pipeline(&listing, &mut debug)).await;

        match outcome {
            Ok(Ok(doc)) => {
                info!(
                    "Acquired {} bytes for {} from {}",
                    doc.bytes.len(),
                    listing.listing_code,
                    doc.source_url
                );
                debug.set("source_url", doc.source_url.clone());
                debug.set("content_type_confirmed", doc.content_type_confirmed);
                Ok(Acquisition {
                    listing,
                    bytes: doc.bytes,
                    source_url: doc.source_url,
                    debug,
                })
            }
            Ok(Err(source)) => {
                warn!("Acquisition failed for {}: {}", listing.listing_code, source);
                debug.set("error", source.to_string());
                debug.set("error_kind", source.kind());
                self.record(&listing, "total_failure", &debug, None);
                Err(AcquireError::TotalFailure { source, debug })
            }
            Err(_) => Err(self.fail_deadline(&listing, debug).await),
        }
    }

    async fn run_pipeline(
        &self,
        listing: &ListingReference,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        let resolution = discovery::resolve(&self.client, &listing.listing_url, debug).await;
        let ctx = FetchContext {
            client: &self.client,
            browser: self.browser.as_ref(),
            settings: &self.settings,
            prefetched: resolution.prefetched_page(),
        };
        self.registry
            .dispatch(&ctx, &resolution.resolved_url, debug)
            .await
    }

    async fn fail_deadline(&self, listing: &ListingReference, debug: DebugMeta) -> AcquireError {
        let after = self.settings.overall_deadline();
        let step = debug.current_step().unwrap_or("unknown");
        warn!(
            "Acquisition for {} exceeded {:?} during {}",
            listing.listing_code, after, step
        );
        let network = self.diagnose(&debug, listing).await;
        self.record(listing, "deadline", &debug, Some(network));
        AcquireError::Deadline { after, debug }
    }

    async fn fail_unexpected(
        &self,
        listing: &ListingReference,
        message: String,
        mut debug: DebugMeta,
    ) -> AcquireError {
        warn!("Unexpected failure for {}: {}", listing.listing_code, message);
        debug.set("error", message.clone());
        let network = self.diagnose(&debug, listing).await;
        self.record(listing, "unexpected", &debug, Some(network));
        AcquireError::Unexpected { message, debug }
    }

    /// Network diagnostics against the URL the pipeline was working on.
    async fn diagnose(&self, debug: &DebugMeta, listing: &ListingReference) -> serde_json::Value {
        let target = debug
            .get("resolved_url")
            .and_then(|v| v.as_str())
            .unwrap_or(&listing.listing_url);
        network_diagnostics(&self.client, target, &self.settings.probe_url).await
    }

    fn record(
        &self,
        listing: &ListingReference,
        label: &str,
        debug: &DebugMeta,
        network: Option<serde_json::Value>,
    ) {
        self.failcases.record(&FailCase {
            timestamp: Utc::now(),
            listing_code: listing.listing_code.clone(),
            label: label.to_string(),
            debug_meta: debug.clone(),
            network,
            optional_bytes: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::Strategy;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Catch-all that never answers.
    struct Stalls;

    #[async_trait]
    impl Strategy for Stalls {
        fn name(&self) -> &'static str {
            "stalls"
        }

        fn matches(&self, _url: &url::Url) -> bool {
            true
        }

        async fn try_fetch(
            &self,
            _ctx: &FetchContext<'_>,
            _url: &str,
            _debug: &mut DebugMeta,
        ) -> Result<FetchedDocument, FetchError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(FetchError::Timeout("stalled".to_string()))
        }
    }

    #[test]
    fn test_error_exposes_step() {
        let mut debug = DebugMeta::new();
        debug.step("strategy");
        let err = AcquireError::TotalFailure {
            source: FetchError::NoCandidate {
                strategy: "generic".to_string(),
                tried: 3,
            },
            debug,
        };
        assert_eq!(err.step(), Some("strategy"));
        assert_eq!(err.label(), "total_failure");
        assert!(err.to_string().contains("no candidate validated"));
    }

    #[test]
    fn test_disabled_browser_is_unavailable() {
        let mut settings = Settings::default();
        settings.browser.enabled = false;
        assert!(!default_browser(&settings).is_available());
    }

    #[tokio::test]
    async fn test_deadline_reports_step_and_records_failcase() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();
        settings.overall_deadline_seconds = 1;
        settings.retry_base_millis = 1;
        settings.probe_url = "http://127.0.0.1:9/".to_string();
        settings.browser.enabled = false;

        let acquirer = Acquirer::new(settings)
            .unwrap()
            .with_registry(StrategyRegistry::new(Vec::new(), Box::new(Stalls)));
        let err = acquirer
            .acquire_prospectus("http://127.0.0.1:9/bolig/412345678")
            .await
            .unwrap_err();

        assert_eq!(err.label(), "deadline");
        assert_eq!(err.step(), Some("strategy"));
        let names: Vec<String> = std::fs::read_dir(dir.path().join("failcases"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert!(names.iter().any(|n| n.ends_with("_412345678_deadline.json")));
    }
}
