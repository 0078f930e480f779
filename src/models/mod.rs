//! Data models for prospectus acquisition and report isolation.

mod debug;
mod document;
mod listing;

pub use debug::{DebugMeta, ISOLATED_REPORT_KEY, STEP_KEY};
pub use document::{
    ArtifactKind, BrokerPage, DocumentCandidate, ExtractionEngine, FailCase, FetchedDocument,
    PageText, PersistedArtifact, SpanMethod, SpanResult,
};
pub use listing::{infer_listing_code, ListingReference};
