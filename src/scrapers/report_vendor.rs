//! Strategy for condition-report portals: these serve the report on its
//! own, so the bytes are marked as an already-isolated report.

use async_trait::async_trait;
use url::Url;

use super::candidates::DocumentTarget;
use super::error::FetchError;
use super::pipeline::{DocumentHunt, RenderMode};
use super::{host_matches, FetchContext, Strategy};
use crate::models::{DebugMeta, FetchedDocument, ISOLATED_REPORT_KEY};

/// Hosts that publish condition reports directly.
pub const REPORT_VENDOR_HOSTS: &[&str] = &[
    "tilstandsrapport.no",
    "boligsalgsrapport.no",
    "takstrapport.no",
    "norsktakst.no",
    "anticimex.no",
];

/// Fetches condition reports from report-vendor portals.
#[derive(Debug, Default)]
pub struct ReportVendorStrategy;

#[async_trait]
impl Strategy for ReportVendorStrategy {
    fn name(&self) -> &'static str {
        "report_vendor"
    }

    fn matches(&self, url: &Url) -> bool {
        REPORT_VENDOR_HOSTS.iter().any(|host| host_matches(url, host))
    }

    async fn try_fetch(
        &self,
        ctx: &FetchContext<'_>,
        url: &str,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        let doc = DocumentHunt {
            strategy: self.name(),
            target: DocumentTarget::ConditionReport,
            hints: &[],
            render: RenderMode::Script,
        }
        .run(ctx, url, debug)
        .await?;

        debug.set(ISOLATED_REPORT_KEY, true);
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_vendor_hosts_only() {
        let strategy = ReportVendorStrategy;
        assert!(strategy.matches(&Url::parse("https://portal.tilstandsrapport.no/r/1").unwrap()));
        assert!(!strategy.matches(&Url::parse("https://www.finn.no/ad.html").unwrap()));
    }
}
