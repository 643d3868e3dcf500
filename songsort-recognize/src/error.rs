//! Error types for songsort-recognize

use thiserror::Error;

use crate::services::ScanError;

/// Run-level failures
///
/// Per-file recognizer failures never surface here; they are recorded as
/// `Errored` outcomes.
#[derive(Debug, Error)]
pub enum RecognizeError {
    /// Input folder missing or not a directory
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    /// Invalid effective configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dataset or artifact persistence failure
    #[error("Common error: {0}")]
    Common(#[from] songsort_common::Error),

    /// Worker task failure
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type RecognizeResult<T> = std::result::Result<T, RecognizeError>;
