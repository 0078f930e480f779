//! Browser document hunt: sniff, click, harvest, native download.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::{EventResponseReceived, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::{BrowserEngineConfig, BrowserEngineType};
use super::stealth::STEALTH_SCRIPTS;
use super::types::{BinaryFetchResponse, HuntStage};
use super::{find_chrome, BrowserFallback};
use crate::config::Settings;
use crate::models::{DebugMeta, FetchedDocument};
use crate::scrapers::candidates::{CandidateScanner, DocumentTarget};
use crate::scrapers::error::FetchError;
use crate::scrapers::http_client::HttpClient;
use crate::scrapers::verify::Verifier;
use crate::utils::{
    content_type_is_pdf, decoded_lowercase, has_document_extension, resolve_url,
    validate_pdf_payload, Lexicon, PayloadVerdict,
};

/// How long to keep draining buffered network events.
const EVENT_DRAIN_WINDOW: Duration = Duration::from_millis(100);

/// Download directory poll interval.
const DOWNLOAD_POLL: Duration = Duration::from_millis(250);

/// JavaScript to wait for page ready state.
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Elements worth clicking.
const CLICKABLE_SELECTOR: &str = "a, button, [role='button']";

fn browser_err(e: impl std::fmt::Display) -> FetchError {
    FetchError::Browser(e.to_string())
}

#[derive(Debug, Clone, Copy)]
struct HuntTimeouts {
    navigation: Duration,
    idle: Duration,
    click: Duration,
    download: Duration,
}

/// Chromium-backed browser fallback. The browser is launched lazily and
/// shared; each hunt runs in its own page.
pub struct BrowserHunter {
    config: BrowserEngineConfig,
    timeouts: HuntTimeouts,
    max_candidates: usize,
    chrome_path: Option<PathBuf>,
    browser: Mutex<Option<Browser>>,
}

impl BrowserHunter {
    pub fn from_settings(settings: &Settings) -> Self {
        let config = settings.browser.clone();
        let chrome_path = if config.enabled && config.remote_url.is_none() {
            find_chrome(config.chrome_path.as_deref())
        } else {
            None
        };

        Self {
            config,
            timeouts: HuntTimeouts {
                navigation: settings.browser_timeout(),
                idle: settings.browser_idle_wait(),
                click: settings.click_wait(),
                download: settings.download_wait(),
            },
            max_candidates: settings.max_candidates,
            chrome_path,
            browser: Mutex::new(None),
        }
    }

    /// Launch or connect to browser if not already running.
    async fn ensure_browser(&self) -> Result<(), FetchError> {
        let mut guard = self.browser.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let browser = match self.config.remote_url.clone() {
            Some(remote_url) => self.connect_remote(&remote_url).await?,
            None => self.launch().await?,
        };
        *guard = Some(browser);
        Ok(())
    }

    async fn launch(&self) -> Result<Browser, FetchError> {
        let chrome_path = self
            .chrome_path
            .clone()
            .ok_or_else(|| FetchError::Browser("Chrome/Chromium not found".to_string()))?;

        info!("Launching browser (headless={})", self.config.headless);
        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--lang=nb-NO")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| FetchError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&self, url: &str) -> Result<Browser, FetchError> {
        info!("Connecting to remote browser at {}", url);

        // WebSocket URL comes from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .timeout(self.timeouts.navigation)
            .send()
            .await
            .map_err(browser_err)?
            .json()
            .await
            .map_err(browser_err)?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Browser("No webSocketDebuggerUrl in response".to_string()))?;

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: self.timeouts.navigation,
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(browser_err)?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    async fn open_page(&self) -> Result<Page, FetchError> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| FetchError::Browser("browser not initialized".to_string()))?;
        browser.new_page("about:blank").await.map_err(browser_err)
    }

    async fn navigate(&self, page: &Page, url: &str) -> Result<(), FetchError> {
        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        tokio::time::timeout(self.timeouts.navigation, page.execute(nav_params))
            .await
            .map_err(|_| FetchError::Timeout(format!("navigation to {}", url)))?
            .map_err(browser_err)?;
        Ok(())
    }

    async fn wait_for_page_ready(&self, page: &Page) {
        match tokio::time::timeout(
            self.timeouts.navigation,
            page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()),
        )
        .await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => debug!("Could not check ready state: {}", e),
            Err(_) => warn!("Timeout waiting for page ready state"),
        }
    }

    async fn apply_stealth(&self, page: &Page) {
        if self.config.engine != BrowserEngineType::Stealth {
            return;
        }
        for script in STEALTH_SCRIPTS {
            if let Err(e) = page.evaluate(script.to_string()).await {
                debug!("Stealth script injection skipped: {}", e);
            }
        }
    }

    async fn allow_downloads(&self, page: &Page, dir: &Path) {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.to_string_lossy().to_string())
            .build();
        match params {
            Ok(params) => {
                if let Err(e) = page.execute(params).await {
                    debug!("Download behavior not set: {}", e);
                }
            }
            Err(e) => debug!("Download behavior params invalid: {}", e),
        }
    }

    async fn hunt_inner(
        &self,
        page: &Page,
        client: &HttpClient,
        url: &str,
        target: DocumentTarget,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        let lexicon = target.lexicon();

        page.execute(SetUserAgentOverrideParams::new(client.user_agent().to_string()))
            .await
            .map_err(browser_err)?;

        let download_dir = TempDir::new().map_err(browser_err)?;
        self.allow_downloads(page, download_dir.path()).await;

        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(browser_err)?;

        self.navigate(page, url).await?;
        self.wait_for_page_ready(page).await;
        self.apply_stealth(page).await;
        tokio::time::sleep(self.timeouts.idle).await;

        let page_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());
        let verifier = Verifier::new(client, target);
        let mut seen: HashSet<String> = HashSet::new();

        debug.step("browser_sniff");
        for doc_url in drain_document_responses(&mut responses, lexicon).await {
            if seen.insert(doc_url.clone()) {
                if let Ok(doc) = self
                    .fetch_found(page, &verifier, &doc_url, &page_url, HuntStage::Sniff, debug)
                    .await
                {
                    return Ok(doc);
                }
            }
        }

        debug.step("browser_click");
        let elements = page.find_elements(CLICKABLE_SELECTOR).await.unwrap_or_default();
        let mut clicks = 0;
        for element in elements {
            if clicks >= self.max_candidates {
                break;
            }
            let text = element
                .inner_text()
                .await
                .ok()
                .flatten()
                .unwrap_or_default()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() || !lexicon.is_positive(&text) || lexicon.is_negative(&text) {
                continue;
            }
            clicks += 1;

            let href = element
                .attribute("href")
                .await
                .ok()
                .flatten()
                .and_then(|h| resolve_url(&page_url, &h));
            if let Some(href) = href {
                if seen.insert(href.clone()) {
                    if let Ok(doc) = self
                        .fetch_found(page, &verifier, &href, &page_url, HuntStage::ClickHref, debug)
                        .await
                    {
                        return Ok(doc);
                    }
                }
            }

            debug!("Clicking {:?}", text);
            if element.click().await.is_err() {
                continue;
            }
            tokio::time::sleep(self.timeouts.click).await;

            for doc_url in drain_document_responses(&mut responses, lexicon).await {
                if seen.insert(doc_url.clone()) {
                    if let Ok(doc) = self
                        .fetch_found(page, &verifier, &doc_url, &page_url, HuntStage::Click, debug)
                        .await
                    {
                        return Ok(doc);
                    }
                }
            }
        }

        debug.step("browser_harvest");
        let html = page.content().await.map_err(browser_err)?;
        let candidates = CandidateScanner::new(target).scan(&page_url, &html);
        debug.set("browser_harvested", candidates.len());
        for candidate in candidates.iter().take(self.max_candidates) {
            if seen.insert(candidate.url.clone()) {
                if let Ok(doc) = self
                    .fetch_found(page, &verifier, &candidate.url, &page_url, HuntStage::Harvest, debug)
                    .await
                {
                    return Ok(doc);
                }
            }
        }

        debug.step("browser_download");
        if let Some(doc) =
            wait_for_download(download_dir.path(), self.timeouts.download, lexicon, &page_url).await
        {
            record(debug, HuntStage::Download, &doc.source_url, "ok");
            return Ok(doc);
        }

        Err(FetchError::NoCandidate {
            strategy: "browser".to_string(),
            tried: seen.len(),
        })
    }

    /// Fetch a URL found in the browser: out-of-band first, then in-page
    /// `fetch()` when the server refuses the out-of-band request.
    async fn fetch_found(
        &self,
        page: &Page,
        verifier: &Verifier<'_>,
        doc_url: &str,
        page_url: &str,
        stage: HuntStage,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        let refused = match verifier.verify(doc_url, Some(page_url), debug).await {
            Ok(doc) => {
                record(debug, stage, doc_url, "ok");
                return Ok(doc);
            }
            Err(e @ FetchError::Network(_)) => e,
            Err(e) => {
                record(debug, stage, doc_url, e.kind());
                return Err(e);
            }
        };

        debug!("Out-of-band fetch of {} refused ({}), trying in-page fetch", doc_url, refused);
        let response = match fetch_in_page(page, doc_url).await {
            Ok(r) => r,
            Err(e) => {
                record(debug, stage, doc_url, "in_page_failed");
                return Err(e);
            }
        };

        match validate_pdf_payload(Some(&response.content_type), &response.data) {
            PayloadVerdict::Pdf {
                content_type_confirmed,
            } => {
                record(debug, stage, doc_url, "ok_in_page");
                Ok(FetchedDocument::new(
                    response.data,
                    response.url,
                    content_type_confirmed,
                ))
            }
            other => {
                debug!(
                    "In-page fetch of {} rejected ({}, HTTP {})",
                    doc_url,
                    other.reason(),
                    response.status
                );
                record(debug, stage, doc_url, other.reason());
                Err(FetchError::validation(doc_url, other.reason()))
            }
        }
    }
}

#[async_trait]
impl BrowserFallback for BrowserHunter {
    fn is_available(&self) -> bool {
        self.config.enabled && (self.config.remote_url.is_some() || self.chrome_path.is_some())
    }

    async fn hunt(
        &self,
        client: &HttpClient,
        url: &str,
        target: DocumentTarget,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        self.ensure_browser().await?;
        let page = self.open_page().await?;

        let budget = self.timeouts.navigation + self.timeouts.idle;
        let result = match tokio::time::timeout(
            budget,
            self.hunt_inner(&page, client, url, target, debug),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(format!("browser hunt on {}", url))),
        };

        let _ = page.close().await;
        if let Ok(doc) = &result {
            info!("Browser stage found {} ({} bytes)", doc.source_url, doc.bytes.len());
        }
        result
    }
}

fn record(debug: &mut DebugMeta, stage: HuntStage, url: &str, outcome: &str) {
    debug.push(
        "browser_attempts",
        json!({"stage": stage.as_str(), "url": url, "outcome": outcome}),
    );
    if outcome.starts_with("ok") {
        debug.set("browser_stage", stage.as_str());
    }
}

/// Collect buffered responses that look like documents, rejecting
/// negative-lexicon URLs outright.
async fn drain_document_responses(
    stream: &mut EventStream<EventResponseReceived>,
    lexicon: &Lexicon,
) -> Vec<String> {
    let mut found = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(EVENT_DRAIN_WINDOW, stream.next()).await {
        let response = &event.response;
        let pdf_like =
            content_type_is_pdf(Some(&response.mime_type)) || has_document_extension(&response.url);
        if !pdf_like {
            continue;
        }
        if lexicon.is_negative(&decoded_lowercase(&response.url)) {
            debug!("Sniffed response rejected by lexicon: {}", response.url);
            continue;
        }
        found.push(response.url.clone());
    }
    found
}

/// Poll the download directory until a finished file appears.
async fn wait_for_download(
    dir: &Path,
    wait: Duration,
    lexicon: &Lexicon,
    page_url: &str,
) -> Option<FetchedDocument> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.ends_with(".crdownload") || lexicon.is_negative(&name.to_lowercase()) {
                    continue;
                }
                let Ok(bytes) = tokio::fs::read(entry.path()).await else {
                    continue;
                };
                if let PayloadVerdict::Pdf {
                    content_type_confirmed,
                } = validate_pdf_payload(None, &bytes)
                {
                    info!("Captured download {} ({} bytes)", name, bytes.len());
                    return Some(FetchedDocument::new(
                        bytes,
                        page_url.to_string(),
                        content_type_confirmed,
                    ));
                }
            }
        }

        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(DOWNLOAD_POLL).await;
    }
}

/// Fetch a binary from within the page context, keeping the page's cookies
/// and anti-bot session state.
async fn fetch_in_page(page: &Page, url: &str) -> Result<BinaryFetchResponse, FetchError> {
    let url_literal = serde_json::to_string(url).map_err(browser_err)?;
    let fetch_script = format!(
        r#"
        (async () => {{
            try {{
                const response = await fetch({}, {{
                    method: 'GET',
                    credentials: 'include',
                    headers: {{ 'Accept': 'application/pdf, */*' }}
                }});

                if (!response.ok) {{
                    return {{ error: `HTTP ${{response.status}}`, status: response.status }};
                }}

                const contentType = response.headers.get('content-type') || 'application/octet-stream';
                const bytes = new Uint8Array(await response.arrayBuffer());

                let binary = '';
                for (let i = 0; i < bytes.length; i++) {{
                    binary += String.fromCharCode(bytes[i]);
                }}

                return {{
                    status: response.status,
                    url: response.url,
                    contentType: contentType,
                    data: btoa(binary)
                }};
            }} catch (e) {{
                return {{ error: e.toString() }};
            }}
        }})()
        "#,
        url_literal
    );

    let result: serde_json::Value = page
        .evaluate(fetch_script)
        .await
        .map_err(browser_err)?
        .into_value()
        .map_err(browser_err)?;

    if let Some(error) = result.get("error").and_then(|e| e.as_str()) {
        return Err(FetchError::Browser(format!("in-page fetch failed: {}", error)));
    }

    let status = result.get("status").and_then(|s| s.as_u64()).unwrap_or(0) as u16;
    let content_type = result
        .get("contentType")
        .and_then(|c| c.as_str())
        .unwrap_or("application/octet-stream")
        .to_string();
    let final_url = result
        .get("url")
        .and_then(|u| u.as_str())
        .filter(|u| !u.is_empty())
        .unwrap_or(url)
        .to_string();
    let data_b64 = result.get("data").and_then(|d| d.as_str()).unwrap_or("");

    let data = base64::engine::general_purpose::STANDARD
        .decode(data_b64)
        .map_err(browser_err)?;

    debug!(
        "In-page fetch got HTTP {} with {} bytes, content-type: {}",
        status,
        data.len(),
        content_type
    );

    Ok(BinaryFetchResponse {
        url: final_url,
        status,
        content_type,
        data,
    })
}
