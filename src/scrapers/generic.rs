//! Catch-all strategy for broker sites without a profile.

use async_trait::async_trait;
use url::Url;

use super::candidates::DocumentTarget;
use super::error::FetchError;
use super::pipeline::{DocumentHunt, RenderMode};
use super::{FetchContext, Strategy};
use crate::models::{DebugMeta, FetchedDocument};

/// Matches every URL; always registered last.
#[derive(Debug, Default)]
pub struct GenericStrategy;

#[async_trait]
impl Strategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn matches(&self, _url: &Url) -> bool {
        true
    }

    async fn try_fetch(
        &self,
        ctx: &FetchContext<'_>,
        url: &str,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        DocumentHunt {
            strategy: self.name(),
            target: DocumentTarget::Prospectus,
            hints: &[],
            render: RenderMode::Static,
        }
        .run(ctx, url, debug)
        .await
    }
}
