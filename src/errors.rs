//! Run-level error kinds and their exit codes.

use std::path::PathBuf;
use std::time::Duration;

use log_sync_core::StoreError;

use crate::loader::LoadError;

/// Errors that end a `logsync` run.
///
/// Per-record write failures are not here: they are collected in
/// [`log_sync_core::BatchResult`] and the run carries on.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot connect to store '{url}': {reason}")]
    Connection { url: String, reason: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("export to {path} failed: {reason}")]
    Export { path: PathBuf, reason: String },

    #[error("run did not finish within {0:?}")]
    Timeout(Duration),
}

impl SyncError {
    /// Process exit code: 2 for configuration problems, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Configuration(_) => 2,
            _ => 1,
        }
    }

    pub(crate) fn export(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SyncError::Export {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
