//! Error types for songsort-organize

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::pattern::PatternError;

/// Per-file transfer failure; recorded, never aborts the plan
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Destination exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    pub(crate) fn io(action: &'static str, path: &std::path::Path, source: io::Error) -> Self {
        TransferError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Run-level failures, all raised before any file is touched
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Common(#[from] songsort_common::Error),
}

pub type OrganizeResult<T> = std::result::Result<T, OrganizeError>;
