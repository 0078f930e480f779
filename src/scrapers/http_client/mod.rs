//! HTTP client with a browser-like identity and bounded retries.

mod response;
mod retry;
mod user_agent;

pub use response::{parse_content_disposition_filename, HeadResponse, HttpResponse};
pub use retry::{is_transient_status, Attempt, RetryPolicy, TRANSIENT_STATUS_CODES};
pub use user_agent::{resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::config::Settings;

use response::collect_headers;

/// HTTP-level failures.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid header {0}")]
    InvalidHeader(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl HttpError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Status { status, .. } => is_transient_status(*status),
            Self::Transport { source, .. } => source.is_connect() || source.is_request(),
            Self::InvalidHeader(_) | Self::Build(_) => false,
        }
    }

    /// Status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Shared HTTP session: one connection pool, cookie jar and header set,
/// reused by every strategy within one acquisition.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Build a client from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, HttpError> {
        Self::build(
            settings.request_timeout(),
            settings.user_agent.as_deref(),
            settings.headers.iter(),
            RetryPolicy::new(settings.retry_base()),
        )
    }

    /// Create a new HTTP client.
    /// - `user_agent_config` None: default desktop Chrome user agent
    /// - Some("impersonate"): random real browser user agent
    /// - Some(custom): custom user agent string
    pub fn build<'a>(
        timeout: Duration,
        user_agent_config: Option<&str>,
        extra_headers: impl IntoIterator<Item = (&'a String, &'a String)>,
        retry: RetryPolicy,
    ) -> Result<Self, HttpError> {
        let user_agent = resolve_user_agent(user_agent_config);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("nb-NO,nb;q=0.9,no;q=0.8,en-US;q=0.6,en;q=0.5"),
        );
        for (name, value) in extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| HttpError::InvalidHeader(name.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| HttpError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .user_agent(&user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(HttpError::Build)?;

        Ok(Self {
            client,
            user_agent,
            retry,
        })
    }

    /// User agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET with retries on transient failures. Non-success statuses are errors.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.get_with_referer(url, None).await
    }

    /// GET carrying a Referer header; some broker document endpoints check it.
    pub async fn get_with_referer(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<HttpResponse, HttpError> {
        self.retry
            .run(|attempt| async move {
                debug!("GET {} (attempt {})", url, attempt + 1);
                let mut request = self.client.get(url);
                if let Some(referer) = referer {
                    request = request.header(reqwest::header::REFERER, referer);
                }
                let response = match request.send().await {
                    Ok(r) => r,
                    Err(e) => return classify(HttpError::from_reqwest(url, e)),
                };

                let status = response.status();
                if !status.is_success() {
                    return classify(HttpError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                Attempt::Done(HttpResponse {
                    status,
                    headers: collect_headers(response.headers()),
                    final_url: response.url().to_string(),
                    response,
                })
            })
            .await
    }

    /// GET a page as text, returning the body and the final URL.
    pub async fn get_text(&self, url: &str) -> Result<(String, String), HttpError> {
        let response = self.get(url).await?;
        let final_url = response.final_url.clone();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::from_reqwest(url, e))?;
        Ok((text, final_url))
    }

    /// Single HEAD request. Any status is returned; only transport failures are errors.
    pub async fn head(&self, url: &str) -> Result<HeadResponse, HttpError> {
        debug!("HEAD {}", url);
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(url, e))?;

        Ok(HeadResponse {
            status: response.status(),
            headers: collect_headers(response.headers()),
            final_url: response.url().to_string(),
        })
    }

    /// Read a successful response's body, mapping read failures.
    pub async fn read_bytes(&self, response: HttpResponse) -> Result<Vec<u8>, HttpError> {
        let url = response.final_url.clone();
        response
            .bytes()
            .await
            .map_err(|e| HttpError::from_reqwest(&url, e))
    }
}

fn classify<T>(err: HttpError) -> Attempt<T, HttpError> {
    if err.is_transient() {
        Attempt::Transient(err)
    } else {
        Attempt::Fatal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_build_from_default_settings() {
        let client = HttpClient::from_settings(&Settings::default()).unwrap();
        assert_eq!(client.user_agent(), USER_AGENT);
        assert_eq!(client.retry_policy().max_attempts, 2);
    }

    #[test]
    fn test_invalid_extra_header_is_rejected() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let result = HttpClient::build(
            Duration::from_secs(5),
            None,
            headers.iter(),
            RetryPolicy::new(Duration::from_millis(1)),
        );
        assert!(matches!(result, Err(HttpError::InvalidHeader(_))));
    }

    #[test]
    fn test_status_error_classification() {
        let transient = HttpError::Status {
            status: 503,
            url: "https://x".into(),
        };
        let fatal = HttpError::Status {
            status: 404,
            url: "https://x".into(),
        };
        assert!(transient.is_transient());
        assert!(!fatal.is_transient());
        assert_eq!(fatal.status(), Some(404));
        assert!(HttpError::Timeout { url: "https://x".into() }.is_transient());
    }
}
