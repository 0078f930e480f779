//! Browser fetch response types.

/// Response from an in-page binary fetch.
#[derive(Debug, Clone)]
pub struct BinaryFetchResponse {
    pub url: String,
    pub status: u16,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Which browser attempt produced (or failed to produce) a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuntStage {
    /// Passive network-response sniffing.
    Sniff,
    /// Out-of-band fetch of a clickable element's href.
    ClickHref,
    /// Response observed after a real click.
    Click,
    /// URL harvested from the rendered DOM, scripts or embedded JSON.
    Harvest,
    /// File landed in the download directory.
    Download,
}

impl HuntStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sniff => "sniff",
            Self::ClickHref => "click_href",
            Self::Click => "click",
            Self::Harvest => "harvest",
            Self::Download => "download",
        }
    }
}
