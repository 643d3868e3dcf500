//! Recognizer capability and outcome classification

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use songsort_common::models::{RecognizedRecord, TrackMetadata, NO_MATCH};
use songsort_common::{RecognitionOutcome, SourceFile};

/// Backend answer for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Matched(TrackMetadata),
    /// No match, with an optional backend-provided reason
    NoMatch(Option<String>),
}

/// Recognizer failures; each becomes an `Errored` outcome
///
/// The display strings are what lands in the error log.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// Recognizer program could not be started
    #[error("SpawnError: {0}")]
    Spawn(String),

    /// Recognizer program exited non-zero
    #[error("ChildExit {0}")]
    ChildExit(i32),

    /// Output was not a valid response document
    #[error("ParseError: {0}")]
    Parse(String),

    /// Call exceeded the configured timeout
    #[error("Timeout after {0}s")]
    Timeout(u64),

    /// I/O failure talking to the recognizer
    #[error("IoError: {0}")]
    Io(String),

    /// Recognizer implementation panicked
    #[error("Panic: {0}")]
    Panic(String),

    /// Any other backend failure
    #[error("{0}")]
    Backend(String),
}

/// External recognition capability
///
/// Implementations must be safe to call from several workers at once; pacing
/// is the caller's job.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, path: &Path) -> Result<Recognition, RecognizerError>;
}

/// Map a recognizer result onto the tri-state outcome
///
/// A match without artist or song title is treated as no match.
pub fn classify(
    source: SourceFile,
    result: Result<Recognition, RecognizerError>,
) -> RecognitionOutcome {
    match result {
        Ok(Recognition::Matched(metadata)) if metadata.is_usable() => {
            RecognitionOutcome::Recognized(RecognizedRecord::new(source, metadata))
        }
        Ok(Recognition::Matched(_)) => RecognitionOutcome::Unrecognized {
            source,
            reason: NO_MATCH.to_string(),
        },
        Ok(Recognition::NoMatch(reason)) => RecognitionOutcome::Unrecognized {
            source,
            reason: reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| NO_MATCH.to_string()),
        },
        Err(e) => RecognitionOutcome::Errored {
            source,
            message: e.to_string(),
        },
    }
}
