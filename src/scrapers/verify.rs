//! Network verification of a candidate: HEAD first, then GET, then
//! payload validation.

use serde_json::json;
use tracing::{debug, info};

use super::candidates::DocumentTarget;
use super::error::FetchError;
use super::http_client::HttpClient;
use crate::models::{DebugMeta, DocumentCandidate, FetchedDocument};
use crate::utils::{
    content_type_is_html, decoded_lowercase, has_document_extension, validate_pdf_payload,
    PayloadVerdict,
};

/// Confirms that a URL serves the target document.
pub struct Verifier<'a> {
    client: &'a HttpClient,
    target: DocumentTarget,
}

impl<'a> Verifier<'a> {
    pub fn new(client: &'a HttpClient, target: DocumentTarget) -> Self {
        Self { client, target }
    }

    /// Verify one URL.
    ///
    /// A HEAD answering `text/html` for a URL without a document extension
    /// rejects the URL outright; any other HEAD outcome falls through to GET.
    pub async fn verify(
        &self,
        url: &str,
        referer: Option<&str>,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        let lexicon = self.target.lexicon();
        if lexicon.is_negative(&decoded_lowercase(url)) {
            return Err(FetchError::validation(url, "negative_lexicon"));
        }

        match self.client.head(url).await {
            Ok(head) => {
                if let Some(filename) = head.content_disposition_filename() {
                    self.check_filename(url, &filename, debug)?;
                }
                if head.is_success()
                    && content_type_is_html(head.content_type())
                    && !has_document_extension(url)
                {
                    return Err(FetchError::validation(url, "head_html"));
                }
            }
            Err(e) => debug!("HEAD {} inconclusive: {}", url, e),
        }

        let response = self.client.get_with_referer(url, referer).await?;
        let content_type = response.content_type().map(str::to_string);
        let final_url = response.final_url.clone();
        if let Some(filename) = response.content_disposition_filename() {
            self.check_filename(url, &filename, debug)?;
        }

        let bytes = self.client.read_bytes(response).await?;
        let verdict = validate_pdf_payload(content_type.as_deref(), &bytes);

        match verdict {
            PayloadVerdict::Pdf {
                content_type_confirmed,
            } => {
                info!("Validated PDF from {} ({} bytes)", final_url, bytes.len());
                Ok(FetchedDocument::new(bytes, final_url, content_type_confirmed))
            }
            other => Err(FetchError::validation(url, other.reason())),
        }
    }

    /// Try candidates in descending score order; the first validated one wins.
    ///
    /// Network and validation failures move on to the next candidate.
    pub async fn verify_candidates(
        &self,
        strategy: &str,
        candidates: &[DocumentCandidate],
        referer: Option<&str>,
        max_candidates: usize,
        debug: &mut DebugMeta,
    ) -> Result<FetchedDocument, FetchError> {
        let mut tried = 0;
        for candidate in candidates.iter().take(max_candidates) {
            tried += 1;
            match self.verify(&candidate.url, referer, debug).await {
                Ok(doc) => {
                    debug.push(
                        "candidates_tried",
                        json!({"url": candidate.url, "score": candidate.score, "outcome": "ok"}),
                    );
                    debug.set("candidate_label", candidate.label.clone());
                    return Ok(doc);
                }
                Err(e) => {
                    debug!("Candidate {} failed: {}", candidate.url, e);
                    debug.push(
                        "candidates_tried",
                        json!({"url": candidate.url, "score": candidate.score, "outcome": e.kind(), "error": e.to_string()}),
                    );
                }
            }
        }

        Err(FetchError::NoCandidate {
            strategy: strategy.to_string(),
            tried,
        })
    }

    /// Record the server filename and reject it when it names the wrong document.
    fn check_filename(
        &self,
        url: &str,
        filename: &str,
        debug: &mut DebugMeta,
    ) -> Result<(), FetchError> {
        debug.set("content_disposition_filename", filename.to_string());
        if self.target.lexicon().is_negative(&filename.to_lowercase()) {
            return Err(FetchError::validation(url, "negative_filename"));
        }
        Ok(())
    }
}
