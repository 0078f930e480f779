//! Configuration for prospectus acquisition.
//!
//! Settings come from an optional TOML file, then environment variables,
//! then CLI flags (applied by the binary). Every key is camelCase in the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scrapers::browser::BrowserEngineConfig;

/// Config filename looked up in the working directory.
pub const DEFAULT_CONFIG_FILENAME: &str = "prospectus.toml";

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Empirically tuned constants. Kept as named, overridable values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thresholds {
    /// Smallest byte size an isolated report may have.
    pub min_report_bytes: u64,
    /// Smallest page count an isolated report may have.
    pub min_report_pages: usize,
    /// Consecutive pages without report vocabulary that end a span.
    pub low_signal_streak: usize,
    /// Shortest span the anchor and aggressive layers accept.
    pub min_span_pages: usize,
    /// Longest span the aggressive layer accepts.
    pub max_aggressive_window: usize,
    /// Minimum weighted start score for the aggressive layer.
    pub aggressive_start_score: i32,
    /// Minimum score sum for the scored-block layer.
    pub min_block_total: i32,
    /// Pages scanned forward when ranking anchor candidates.
    pub anchor_lookahead: usize,
    /// Non-empty lines inspected for a strict title match.
    pub title_line_window: usize,
    /// Leading slice pages that must carry a strict title.
    pub title_check_pages: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_report_bytes: 10_000,
            min_report_pages: 4,
            low_signal_streak: 4,
            min_span_pages: 4,
            max_aggressive_window: 40,
            aggressive_start_score: 8,
            min_block_total: 12,
            anchor_lookahead: 12,
            title_line_window: 10,
            title_check_pages: 2,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Per-request timeout for HTTP calls.
    pub request_timeout_seconds: u64,
    /// Browser navigation timeout.
    pub browser_timeout_millis: u64,
    /// User agent string, or "impersonate" for a random real browser agent.
    pub user_agent: Option<String>,
    /// Extra headers sent with every request.
    pub headers: HashMap<String, String>,
    /// Root directory for artifacts and failcases.
    pub data_dir: PathBuf,
    /// Upper bound on one whole acquisition.
    pub overall_deadline_seconds: u64,
    /// Idle wait after browser navigation and clicks.
    pub browser_idle_wait_millis: u64,
    /// Window allowed for a click to produce a document response.
    pub click_wait_millis: u64,
    /// Window allowed for a native download to land on disk.
    pub download_wait_millis: u64,
    /// Linear backoff base between retries.
    pub retry_base_millis: u64,
    /// Candidates verified per strategy invocation.
    pub max_candidates: usize,
    /// Return the isolated report instead of the bundle when one exists.
    pub prefer_isolated_report: bool,
    /// Generic reachability probe used in failcase diagnostics.
    pub probe_url: String,
    pub thresholds: Thresholds,
    pub browser: BrowserEngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prospectus");

        Self {
            request_timeout_seconds: 20,
            browser_timeout_millis: 30_000,
            user_agent: None,
            headers: HashMap::new(),
            data_dir,
            overall_deadline_seconds: 180,
            browser_idle_wait_millis: 2_000,
            click_wait_millis: 3_000,
            download_wait_millis: 5_000,
            retry_base_millis: 750,
            max_candidates: 8,
            prefer_isolated_report: false,
            probe_url: "https://www.google.com/generate_204".to_string(),
            thresholds: Thresholds::default(),
            browser: BrowserEngineConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit file, or `prospectus.toml` in the
    /// working directory when present, then apply environment overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILENAME);
                if local.exists() {
                    Self::from_file(&local)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `PROSPECTUS_*` environment variables on top of file values.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_value("PROSPECTUS_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = parse_env("PROSPECTUS_REQUEST_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = env_value("PROSPECTUS_BROWSER_TIMEOUT_MILLIS") {
            self.browser_timeout_millis = parse_env("PROSPECTUS_BROWSER_TIMEOUT_MILLIS", &v)?;
        }
        if let Some(v) = env_value("PROSPECTUS_USER_AGENT") {
            self.user_agent = Some(v);
        }
        if let Some(v) = env_value("PROSPECTUS_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = env_value("PROSPECTUS_BROWSER_ENABLED") {
            self.browser.enabled = parse_env("PROSPECTUS_BROWSER_ENABLED", &v)?;
        }
        if let Some(v) = env_value("PROSPECTUS_BROWSER_REMOTE_URL") {
            self.browser.remote_url = Some(v);
        }
        Ok(())
    }

    /// Sub-timeouts must be strictly shorter than the overall deadline so a
    /// failure is attributable to one stage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let deadline = self.overall_deadline();
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "requestTimeoutSeconds must be positive".to_string(),
            ));
        }
        if self.request_timeout() >= deadline {
            return Err(ConfigError::Invalid(format!(
                "requestTimeoutSeconds ({}) must be shorter than overallDeadlineSeconds ({})",
                self.request_timeout_seconds, self.overall_deadline_seconds
            )));
        }
        if self.browser_timeout() + self.browser_idle_wait() >= deadline {
            return Err(ConfigError::Invalid(format!(
                "browserTimeoutMillis ({}) plus browserIdleWaitMillis ({}) must be shorter than overallDeadlineSeconds ({})",
                self.browser_timeout_millis, self.browser_idle_wait_millis, self.overall_deadline_seconds
            )));
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::Invalid(
                "maxCandidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_millis(self.browser_timeout_millis)
    }

    pub fn overall_deadline(&self) -> Duration {
        Duration::from_secs(self.overall_deadline_seconds)
    }

    pub fn browser_idle_wait(&self) -> Duration {
        Duration::from_millis(self.browser_idle_wait_millis)
    }

    pub fn click_wait(&self) -> Duration {
        Duration::from_millis(self.click_wait_millis)
    }

    pub fn download_wait(&self) -> Duration {
        Duration::from_millis(self.download_wait_millis)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_millis)
    }

    /// Directory holding one bundle per listing code.
    pub fn bundles_dir(&self) -> PathBuf {
        self.data_dir.join("bundles")
    }

    /// Directory holding one isolated report per listing code.
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }

    /// Append-only failcase directory.
    pub fn failcases_dir(&self) -> PathBuf {
        self.data_dir.join("failcases")
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}
