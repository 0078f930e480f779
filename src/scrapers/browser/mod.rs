//! Headless-browser fallback for script-rendered broker sites.
//!
//! Uses chromiumoxide (CDP) with stealth evasion. Without the `browser`
//! feature, or without a Chrome install, the stage is a no-op.

mod config;
#[cfg(feature = "browser")]
mod hunt;
#[cfg(feature = "browser")]
mod stealth;
mod types;

pub use config::{BrowserEngineConfig, BrowserEngineType};
#[cfg(feature = "browser")]
pub use hunt::BrowserHunter;
pub use types::{BinaryFetchResponse, HuntStage};

use async_trait::async_trait;

use super::candidates::DocumentTarget;
use super::error::FetchError;
use super::http_client::HttpClient;
use crate::models::{DebugMeta, FetchedDocument};

/// Optional browser-automation capability.
#[async_trait]
pub trait BrowserFallback: Send + Sync {
    /// Whether the capability can run at all. Unavailable means skip, not fail.
    fn is_available(&self) -> bool;

    /// Navigate to `url` and hunt for the target document: sniff, click,
    /// harvest, then native download, first validated PDF wins.
    async fn hunt(
        &self,
        client: &HttpClient,
        url: &str,
        target: DocumentTarget,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError>;
}

/// Absent browser capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBrowser;

#[async_trait]
impl BrowserFallback for NoBrowser {
    fn is_available(&self) -> bool {
        false
    }

    async fn hunt(
        &self,
        _client: &HttpClient,
        url: &str,
        _target: DocumentTarget,
        _debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        Err(FetchError::Browser(format!(
            "browser support not available for {}",
            url
        )))
    }
}

/// Find a Chrome executable: explicit path, common locations, then `PATH`.
pub fn find_chrome(explicit: Option<&std::path::Path>) -> Option<std::path::PathBuf> {
    const CHROME_PATHS: &[&str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            return Some(p.to_path_buf());
        }
    }

    for cmd in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Some(std::path::PathBuf::from(path));
                }
            }
        }
    }

    None
}
