//! On-disk artifacts: bundles, isolated reports and failcases.
//!
//! Layout under the data directory:
//! `bundles/{listing_code}.pdf`, `reports/{listing_code}.pdf` and an
//! append-only `failcases/` directory. Every file is written to a temp file
//! in the target directory and renamed into place.

mod failcase;
mod gate;
mod sanity;

pub use failcase::{network_diagnostics, FailcaseRecorder};
pub use gate::{looks_like_isolated_report_url, PersistOutcome, Persistence};
pub use sanity::{SanityCheck, SanityFailure};

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::Settings;
use crate::models::{ArtifactKind, PersistedArtifact};

/// Errors writing or validating artifacts.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence abandoned: deadline passed before writing {0}")]
    DeadlinePassed(&'static str),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
///
/// Concurrent writers to the same path leave one complete file, never a
/// torn one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<u64, StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| StorageError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(path, e))?;
    tmp.persist(path).map_err(|e| StorageError::io(path, e.error))?;

    Ok(bytes.len() as u64)
}

/// Keep filenames to a portable character set.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// One bundle and one isolated report per listing code.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    bundles_dir: PathBuf,
    reports_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(bundles_dir: PathBuf, reports_dir: PathBuf) -> Self {
        Self {
            bundles_dir,
            reports_dir,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.bundles_dir(), settings.reports_dir())
    }

    pub fn path_for(&self, kind: ArtifactKind, listing_code: &str) -> PathBuf {
        let dir = match kind {
            ArtifactKind::Bundle => &self.bundles_dir,
            ArtifactKind::IsolatedReport => &self.reports_dir,
        };
        dir.join(format!("{}.pdf", sanitize_component(listing_code)))
    }

    /// Write (or overwrite) the artifact of `kind` for a listing.
    pub fn write(
        &self,
        kind: ArtifactKind,
        listing_code: &str,
        bytes: &[u8],
        page_range: Option<(usize, usize)>,
    ) -> Result<PersistedArtifact, StorageError> {
        let path = self.path_for(kind, listing_code);
        let size_bytes = write_atomic(&path, bytes)?;
        Ok(PersistedArtifact {
            kind,
            path,
            size_bytes,
            page_range,
        })
    }

    /// Delete an artifact. A missing file is not an error.
    pub fn remove(&self, artifact: &PersistedArtifact) -> Result<(), StorageError> {
        match std::fs::remove_file(&artifact.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&artifact.path, e)),
        }
    }
}
