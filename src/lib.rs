//! Property prospectus acquisition and condition-report isolation.
//!
//! Turns a listing URL into validated prospectus PDF bytes through an
//! ordered set of broker-site strategies, then locates the technical
//! condition report inside the bundle and persists both.

pub mod acquire;
pub mod config;
pub mod discovery;
pub mod models;
pub mod ocr;
pub mod scrapers;
pub mod span;
pub mod storage;
pub mod utils;

pub use acquire::{default_browser, AcquireError, Acquirer, Acquisition};
pub use config::Settings;
