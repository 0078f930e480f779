//! Persistence and sanity gate: decides bundle versus isolated report,
//! writes artifacts and rolls back anything that fails its own check.

use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use super::sanity::{SanityCheck, SanityFailure};
use super::{ArtifactStore, FailcaseRecorder, StorageError};
use crate::config::Settings;
use crate::models::{
    ArtifactKind, DebugMeta, ExtractionEngine, FailCase, PersistedArtifact, SpanResult,
};
use crate::ocr::PdfEngine;
use crate::span::detect_span;
use crate::utils::{decoded_lowercase, PROSPECTUS_LEXICON, REPORT_LEXICON};

/// Conservative check for a URL that serves the condition report alone:
/// the path names the report and nothing suggests a full prospectus.
pub fn looks_like_isolated_report_url(url: &str) -> bool {
    let path = url::Url::parse(url)
        .map(|u| decoded_lowercase(u.path()))
        .unwrap_or_else(|_| decoded_lowercase(url));
    REPORT_LEXICON.is_positive(&path) && PROSPECTUS_LEXICON.positive_hits(&path) == 0
}

/// A kept slice and its bytes.
type IsolatedSlice = (PersistedArtifact, Vec<u8>);

/// What the gate kept on disk, and what it hands back.
#[derive(Debug, Clone)]
pub struct PersistOutcome {
    pub bundle: Option<PersistedArtifact>,
    pub isolated: Option<PersistedArtifact>,
    pub span: Option<SpanResult>,
    /// Which artifact `bytes` holds.
    pub returned: ArtifactKind,
    pub bytes: Vec<u8>,
}

impl PersistOutcome {
    pub fn returned_artifact(&self) -> Option<&PersistedArtifact> {
        match self.returned {
            ArtifactKind::Bundle => self.bundle.as_ref(),
            ArtifactKind::IsolatedReport => self.isolated.as_ref(),
        }
    }
}

/// The gate for one listing's validated bytes.
pub struct Persistence<'a> {
    settings: &'a Settings,
    engine: &'a dyn PdfEngine,
    store: ArtifactStore,
    failcases: FailcaseRecorder,
    deadline: Option<Instant>,
}

impl<'a> Persistence<'a> {
    pub fn new(settings: &'a Settings, engine: &'a dyn PdfEngine) -> Self {
        Self {
            settings,
            engine,
            store: ArtifactStore::from_settings(settings),
            failcases: FailcaseRecorder::new(settings.failcases_dir()),
            deadline: None,
        }
    }

    /// Refuse to write artifacts once `deadline` has passed. A caller that
    /// has already given up must not see files appear afterwards.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn write(
        &self,
        kind: ArtifactKind,
        listing_code: &str,
        bytes: &[u8],
        page_range: Option<(usize, usize)>,
    ) -> Result<PersistedArtifact, StorageError> {
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            warn!("Deadline passed, not writing {} for {}", kind.as_str(), listing_code);
            return Err(StorageError::DeadlinePassed(kind.as_str()));
        }
        self.store.write(kind, listing_code, bytes, page_range)
    }

    fn sanity(&self) -> SanityCheck<'_> {
        SanityCheck::new(&self.settings.thresholds, self.engine)
    }

    /// Persist validated bytes for a listing.
    ///
    /// Never returns a document that failed its own sanity check. When
    /// `prefer_isolated` is set and an isolated report survived, that is
    /// returned; otherwise the bundle.
    pub fn persist(
        &self,
        listing_code: &str,
        bytes: &[u8],
        source_url: &str,
        prefer_isolated: bool,
        debug: &mut DebugMeta,
    ) -> Result<PersistOutcome, StorageError> {
        debug.step("persist");

        if debug.is_isolated_report() || looks_like_isolated_report_url(source_url) {
            if let Some(isolated) = self.try_store_isolated(listing_code, bytes, debug)? {
                debug.set("persisted", ArtifactKind::IsolatedReport.as_str());
                return Ok(PersistOutcome {
                    bundle: None,
                    isolated: Some(isolated),
                    span: None,
                    returned: ArtifactKind::IsolatedReport,
                    bytes: bytes.to_vec(),
                });
            }
            info!("Direct report for {} rejected, storing as bundle", listing_code);
        }

        let bundle = self.write(ArtifactKind::Bundle, listing_code, bytes, None)?;
        info!("Bundle for {} written to {}", listing_code, bundle.path.display());

        let (span, isolated) = self.isolate_from_bundle(listing_code, bytes, debug)?;

        let use_isolated = prefer_isolated && isolated.is_some();
        debug.set(
            "persisted",
            if isolated.is_some() {
                "bundle+isolated_report"
            } else {
                "bundle"
            },
        );

        let (returned, returned_bytes) = match (&isolated, use_isolated) {
            (Some((_, slice)), true) => (ArtifactKind::IsolatedReport, slice.clone()),
            _ => (ArtifactKind::Bundle, bytes.to_vec()),
        };

        Ok(PersistOutcome {
            bundle: Some(bundle),
            isolated: isolated.map(|(artifact, _)| artifact),
            span,
            returned,
            bytes: returned_bytes,
        })
    }

    /// Store bytes the strategy already isolated, keeping them only when
    /// they pass the strict sanity check.
    ///
    /// Returns `None` (with no file left behind) on rejection so bundle
    /// handling can proceed.
    pub fn try_store_isolated(
        &self,
        listing_code: &str,
        bytes: &[u8],
        debug: &mut DebugMeta,
    ) -> Result<Option<PersistedArtifact>, StorageError> {
        let artifact = self.write(ArtifactKind::IsolatedReport, listing_code, bytes, None)?;

        match self.sanity().check(bytes, artifact.size_bytes, false) {
            Ok(()) => Ok(Some(artifact)),
            Err(failure) => {
                self.roll_back(listing_code, &artifact, bytes, &failure, debug)?;
                Ok(None)
            }
        }
    }

    /// Detect the report span in a bundle, slice it out and keep the slice
    /// when it passes the strict sanity check.
    fn isolate_from_bundle(
        &self,
        listing_code: &str,
        bytes: &[u8],
        debug: &mut DebugMeta,
    ) -> Result<(Option<SpanResult>, Option<IsolatedSlice>), StorageError> {
        let pages = match self.engine.page_texts(bytes) {
            Ok(pages) => pages,
            Err(e) => {
                warn!("Text extraction failed for {}: {}", listing_code, e);
                debug.set("extraction_error", e.to_string());
                self.note(listing_code, "extraction_error", debug);
                return Ok((None, None));
            }
        };
        debug.set("page_count", pages.len());
        debug.set(
            "ocr_pages",
            pages
                .iter()
                .filter(|p| p.engine == ExtractionEngine::Ocr)
                .count(),
        );

        let Some(span) = detect_span(&pages, &self.settings.thresholds) else {
            debug.set("span", serde_json::Value::Null);
            self.note(listing_code, "no_span", debug);
            return Ok((None, None));
        };
        debug.set(
            "span",
            json!({
                "start": span.start,
                "end": span.end,
                "method": span.method.as_str(),
                "confidence": span.confidence_meta,
            }),
        );

        let slice = match self.engine.slice(bytes, span.start, span.end) {
            Ok(slice) => slice,
            Err(e) => {
                warn!("Slicing pages {}..={} failed: {}", span.start, span.end, e);
                debug.set("slice_error", e.to_string());
                self.note(listing_code, "slice_error", debug);
                return Ok((Some(span), None));
            }
        };
        let artifact = self.write(
            ArtifactKind::IsolatedReport,
            listing_code,
            &slice,
            Some((span.start, span.end)),
        )?;

        match self.sanity().check(&slice, artifact.size_bytes, true) {
            Ok(()) => {
                info!(
                    "Isolated report for {} written to {}",
                    listing_code,
                    artifact.path.display()
                );
                Ok((Some(span), Some((artifact, slice))))
            }
            Err(failure) => {
                self.roll_back(listing_code, &artifact, &slice, &failure, debug)?;
                Ok((Some(span), None))
            }
        }
    }

    fn roll_back(
        &self,
        listing_code: &str,
        artifact: &PersistedArtifact,
        bytes: &[u8],
        failure: &SanityFailure,
        debug: &mut DebugMeta,
    ) -> Result<(), StorageError> {
        warn!(
            "Rolling back {} for {}: {}",
            artifact.path.display(),
            listing_code,
            failure
        );
        self.store.remove(artifact)?;
        debug.push(
            "sanity_rollbacks",
            json!({"kind": artifact.kind.as_str(), "reason": failure.label(), "detail": failure.to_string()}),
        );
        self.failcases.record(&FailCase {
            timestamp: Utc::now(),
            listing_code: listing_code.to_string(),
            label: format!("sanity_rollback_{}", failure.label()),
            debug_meta: debug.clone(),
            network: None,
            optional_bytes: Some(bytes.to_vec()),
        });
        Ok(())
    }

    /// Failcase note for an outcome that is not an error.
    fn note(&self, listing_code: &str, label: &str, debug: &DebugMeta) {
        self.failcases.record(&FailCase {
            timestamp: Utc::now(),
            listing_code: listing_code.to_string(),
            label: label.to_string(),
            debug_meta: debug.clone(),
            network: None,
            optional_bytes: None,
        });
    }
}
