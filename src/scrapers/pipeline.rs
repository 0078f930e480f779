//! The fetch chain shared by every strategy: direct document check, HTML
//! candidate scan, then browser automation.

use std::borrow::Cow;

use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};

use super::candidates::{CandidateScanner, DocumentTarget, DOCUMENT_HOST_PATTERN};
use super::error::FetchError;
use super::verify::Verifier;
use super::FetchContext;
use crate::models::{DebugMeta, FetchedDocument};
use crate::utils::has_document_extension;

/// Candidates listed in debug metadata per scan.
const DEBUG_TOP_CANDIDATES: usize = 5;

/// How a site delivers its document links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Links are present in the served HTML; browser only on failure.
    Static,
    /// Links are rendered by client-side script; browser first.
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Html,
    Browser,
}

/// Whether a URL already points at a document rather than a page.
pub fn is_direct_document_url(url: &str) -> bool {
    has_document_extension(url) || DOCUMENT_HOST_PATTERN.is_match(url)
}

/// One strategy's fetch chain.
pub struct DocumentHunt<'h> {
    pub strategy: &'static str,
    pub target: DocumentTarget,
    pub hints: &'h [Regex],
    pub render: RenderMode,
}

impl DocumentHunt<'_> {
    pub async fn run(
        &self,
        ctx: &FetchContext<'_>,
        url: &str,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        debug.set("target", self.target.as_str());
        let verifier = Verifier::new(ctx.client, self.target);

        if is_direct_document_url(url) {
            debug.step("direct_document");
            match verifier.verify(url, None, debug).await {
                Ok(doc) => {
                    debug.set("fetch_path", "direct");
                    return Ok(doc);
                }
                Err(e) => {
                    debug!("Direct verification of {} failed: {}", url, e);
                    debug.set("direct_error", e.to_string());
                }
            }
        }

        let stages: &[Stage] = if self.render == RenderMode::Script && ctx.browser.is_available() {
            &[Stage::Browser, Stage::Html]
        } else {
            &[Stage::Html, Stage::Browser]
        };

        let mut last_error = None;
        for stage in stages {
            let result = match stage {
                Stage::Html => self.scan_html(ctx, url, &verifier, debug).await,
                Stage::Browser => {
                    if !ctx.browser.is_available() {
                        debug.set("browser", "unavailable");
                        continue;
                    }
                    debug.step("browser");
                    ctx.browser.hunt(ctx.client, url, self.target, debug).await
                }
            };

            match result {
                Ok(doc) => {
                    let path = match stage {
                        Stage::Html => "html_scan",
                        Stage::Browser => "browser",
                    };
                    debug.set("fetch_path", path);
                    return Ok(doc);
                }
                Err(e) => {
                    warn!("{}: {:?} stage failed for {}: {}", self.strategy, stage, url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::NoCandidate {
            strategy: self.strategy.to_string(),
            tried: 0,
        }))
    }

    async fn scan_html(
        &self,
        ctx: &FetchContext<'_>,
        url: &str,
        verifier: &Verifier<'_>,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        debug.step("html_scan");

        let (html, page_url): (Cow<str>, Cow<str>) = match ctx.prefetched_for(url) {
            Some(page) => {
                debug.set("prefetched_page", true);
                (Cow::Borrowed(page.html.as_str()), Cow::Borrowed(page.url.as_str()))
            }
            None => {
                let (html, final_url) = ctx.client.get_text(url).await?;
                (Cow::Owned(html), Cow::Owned(final_url))
            }
        };

        let candidates = CandidateScanner::new(self.target)
            .with_hints(self.hints)
            .scan(&page_url, &html);

        info!("{}: {} candidates on {}", self.strategy, candidates.len(), page_url);
        debug.set("candidate_count", candidates.len());
        debug.set(
            "top_candidates",
            json!(candidates
                .iter()
                .take(DEBUG_TOP_CANDIDATES)
                .map(|c| json!({"url": c.url, "label": c.label, "score": c.score}))
                .collect::<Vec<_>>()),
        );

        if candidates.is_empty() {
            return Err(FetchError::NoCandidate {
                strategy: self.strategy.to_string(),
                tried: 0,
            });
        }

        verifier
            .verify_candidates(
                self.strategy,
                &candidates,
                Some(&page_url),
                ctx.settings.max_candidates,
                debug,
            )
            .await
    }
}
