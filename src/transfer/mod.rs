//! Archive transfer between clients, servers and the record store
//!
//! - [`packager`] builds a zip of a filtered snapshot of the store
//! - [`ingest`] extracts an uploaded zip back into the store
//! - [`export`] pushes a packaged zip to another server's ingest endpoint
//!
//! All three share the same fixed temporary archive path, which is always
//! removed before a transfer returns.

pub mod export;
pub mod filter;
pub mod ingest;
pub mod packager;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::StoreError;

pub use export::{ExportRequest, RemoteExporter};
pub use filter::{Category, CategoryFilter, Scope};
pub use packager::{PackagedArchive, Selection};

/// Sentinel count: the supplied password was wrong
pub const COUNT_BAD_CREDENTIAL: i64 = -1;
/// Sentinel count: the upload was not a readable archive
pub const COUNT_CORRUPT_ARCHIVE: i64 = -2;
/// Sentinel count: the remote server could not be reached or understood
pub const COUNT_TRANSPORT: i64 = -3;

/// Body of every ingest and export response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub success: bool,
    pub count: i64,
}

impl TransferResponse {
    pub fn ok(count: usize) -> Self {
        Self {
            success: true,
            count: count as i64,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid password")]
    Credential,

    #[error("Archive could not be read: {0}")]
    ArchiveCorrupt(String),

    #[error("Remote acknowledged {received} of {sent} records")]
    TransferMismatch { sent: usize, received: i64 },

    #[error("Remote transfer failed: {0}")]
    Transport(String),

    #[error("Filesystem error after {written} records: {source}")]
    Filesystem {
        written: usize,
        #[source]
        source: StoreError,
    },
}

impl TransferError {
    /// A blocking transfer task died before it could report. The records it
    /// wrote are unknown, so nothing is claimed as written.
    pub fn task_failed(temp_path: &Path, detail: impl std::fmt::Display) -> Self {
        TransferError::Filesystem {
            written: 0,
            source: StoreError::io(
                temp_path,
                std::io::Error::other(format!("transfer task failed: {}", detail)),
            ),
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(source: StoreError) -> Self {
        TransferError::Filesystem { written: 0, source }
    }
}

impl From<&TransferError> for TransferResponse {
    fn from(err: &TransferError) -> Self {
        let count = match err {
            TransferError::Credential => COUNT_BAD_CREDENTIAL,
            TransferError::ArchiveCorrupt(_) => COUNT_CORRUPT_ARCHIVE,
            TransferError::TransferMismatch { received, .. } => *received,
            TransferError::Transport(_) => COUNT_TRANSPORT,
            TransferError::Filesystem { written, .. } => *written as i64,
        };
        TransferResponse {
            success: false,
            count,
        }
    }
}

impl From<Result<usize, TransferError>> for TransferResponse {
    fn from(result: Result<usize, TransferError>) -> Self {
        match result {
            Ok(count) => TransferResponse::ok(count),
            Err(err) => TransferResponse::from(&err),
        }
    }
}

/// Exact-match password gate; no configured password means open mode.
pub fn check_credential(configured: Option<&str>, supplied: Option<&str>) -> Result<(), TransferError> {
    match configured {
        None => Ok(()),
        Some(expected) if supplied == Some(expected) => Ok(()),
        Some(_) => Err(TransferError::Credential),
    }
}

/// Owns the temporary archive file and deletes it when dropped.
#[derive(Debug)]
pub struct TempArchive {
    path: PathBuf,
}

impl TempArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now if it is still there.
    pub fn remove(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "Failed to remove temporary archive");
            }
        }
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        self.remove();
    }
}
