//! Ordered strategy registry and first-match dispatch.

use tracing::info;
use url::Url;

use super::error::FetchError;
use super::generic::GenericStrategy;
use super::report_vendor::ReportVendorStrategy;
use super::sites::SiteStrategy;
use super::{FetchContext, Strategy};
use crate::models::{DebugMeta, FetchedDocument};

/// Strategies in fixed priority order, with a catch-all always last.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn Strategy>>,
    catch_all: Box<dyn Strategy>,
}

impl StrategyRegistry {
    /// Build a registry; `catch_all` is consulted only when nothing else matches.
    pub fn new(strategies: Vec<Box<dyn Strategy>>, catch_all: Box<dyn Strategy>) -> Self {
        Self {
            strategies,
            catch_all,
        }
    }

    /// Every built-in strategy.
    pub fn builtin() -> Self {
        let mut strategies: Vec<Box<dyn Strategy>> = vec![Box::new(ReportVendorStrategy)];
        for site in SiteStrategy::all() {
            strategies.push(Box::new(site));
        }
        Self::new(strategies, Box::new(GenericStrategy))
    }

    /// Strategy names in dispatch order, catch-all last.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.catch_all.name()))
            .collect()
    }

    /// First strategy whose `matches` accepts the URL.
    pub fn select(&self, url: &Url) -> &dyn Strategy {
        self.strategies
            .iter()
            .find(|s| s.matches(url))
            .map(|s| s.as_ref())
            .unwrap_or(self.catch_all.as_ref())
    }

    /// Invoke the first matching strategy. Other matching strategies are not tried.
    pub async fn dispatch(
        &self,
        ctx: &FetchContext<'_>,
        url: &str,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let strategy = self.select(&parsed);

        info!("Dispatching {} to strategy {}", url, strategy.name());
        debug.step("strategy");
        debug.set("strategy", strategy.name());

        let doc = strategy.try_fetch(ctx, url, debug).await?;
        if doc.bytes.is_empty() {
            return Err(FetchError::validation(url, "empty_body"));
        }
        Ok(doc)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
