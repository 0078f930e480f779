//! Write-once failcase records for offline triage.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

use super::{sanitize_component, write_atomic, StorageError};
use crate::models::FailCase;
use crate::scrapers::HttpClient;

/// Writes `{timestamp}_{listing_code}_{label}.json` plus an optional sibling
/// `.pdf`. Never overwrites, never deletes.
#[derive(Debug, Clone)]
pub struct FailcaseRecorder {
    dir: PathBuf,
}

impl FailcaseRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record a failcase. Write errors are logged and swallowed so they
    /// never replace the failure being recorded.
    pub fn record(&self, failcase: &FailCase) -> Option<PathBuf> {
        match self.write(failcase) {
            Ok(path) => {
                info!("Failcase {} recorded at {}", failcase.label, path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not record failcase {}: {}", failcase.label, e);
                None
            }
        }
    }

    fn write(&self, failcase: &FailCase) -> Result<PathBuf, StorageError> {
        let stem = self.unused_stem(&format!(
            "{}_{}_{}",
            failcase.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
            sanitize_component(&failcase.listing_code),
            sanitize_component(&failcase.label),
        ));

        let json_path = self.dir.join(format!("{}.json", stem));
        write_atomic(&json_path, &serde_json::to_vec_pretty(failcase)?)?;

        if let Some(bytes) = &failcase.optional_bytes {
            write_atomic(&self.dir.join(format!("{}.pdf", stem)), bytes)?;
        }
        Ok(json_path)
    }

    /// Two failcases within the same millisecond get a numeric suffix.
    fn unused_stem(&self, base: &str) -> String {
        let mut stem = base.to_string();
        let mut n = 1;
        while self.dir.join(format!("{}.json", stem)).exists() {
            stem = format!("{}-{}", base, n);
            n += 1;
        }
        stem
    }
}

/// DNS resolution of the target host, a generic reachability probe, and a
/// probe of the target host's root.
pub async fn network_diagnostics(client: &HttpClient, target_url: &str, probe_url: &str) -> Value {
    let parsed = Url::parse(target_url).ok();
    let host = parsed
        .as_ref()
        .and_then(|u| u.host_str())
        .map(str::to_string);

    let dns = match &host {
        Some(host) => match tokio::net::lookup_host((host.as_str(), 443)).await {
            Ok(addrs) => {
                let addrs: Vec<String> = addrs.map(|a| a.ip().to_string()).collect();
                json!({"host": host, "addresses": addrs})
            }
            Err(e) => json!({"host": host, "error": e.to_string()}),
        },
        None => json!({"error": "no host"}),
    };

    let root = parsed
        .as_ref()
        .filter(|u| u.has_host())
        .map(|u| format!("{}/", u.origin().ascii_serialization()));

    json!({
        "dns": dns,
        "probe": probe(client, probe_url).await,
        "hostRoot": match root {
            Some(root) => probe(client, &root).await,
            None => Value::Null,
        },
    })
}

async fn probe(client: &HttpClient, url: &str) -> Value {
    match client.head(url).await {
        Ok(head) => json!({"url": url, "status": head.status.as_u16()}),
        Err(e) => json!({"url": url, "error": e.to_string()}),
    }
}
