//! Fetch error taxonomy.

use thiserror::Error;

use super::http_client::HttpError;

/// Errors from one strategy invocation or one candidate attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or HTTP error status, after retries.
    #[error(transparent)]
    Network(#[from] HttpError),

    /// The response was reachable but is not the document we want.
    #[error("Rejected {url}: {reason}")]
    Validation { url: String, reason: String },

    /// Every candidate was tried and none validated.
    #[error("{strategy}: no candidate validated ({tried} tried)")]
    NoCandidate { strategy: String, tried: usize },

    #[error("Browser stage failed: {0}")]
    Browser(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    pub fn validation(url: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Only transient network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Short label for debug metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Validation { .. } => "validation",
            Self::NoCandidate { .. } => "no_candidate",
            Self::Browser(_) => "browser",
            Self::Timeout(_) => "timeout",
            Self::InvalidUrl(_) => "invalid_url",
        }
    }
}
