//! Recognition data model
//!
//! Shared between the recognition pipeline (producer) and the organizer (consumer).

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::extensions::dotted_extension;

/// Reason recorded for an unrecognized file when the backend gives none
pub const NO_MATCH: &str = "NO_MATCH";

/// Audio file discovered by a folder scan
///
/// Identity is the path. Never mutated after the scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    path: PathBuf,
    extension: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = dotted_extension(&path);
        Self { path, extension }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension including the dot (`.mp3`), empty when absent
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name without extension
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Semantic fields returned by the recognition backend
///
/// Every field is optional; the recognizer only guarantees `author` and `song`
/// for a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub song: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub release_year: Option<String>,
    #[serde(default)]
    pub genre_primary: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub explicit: Option<bool>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub artist_adamid: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub applemusic_track_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub applemusic_album_id: Option<String>,
}

impl TrackMetadata {
    /// A match is usable when both artist and song title are present
    pub fn is_usable(&self) -> bool {
        has_text(&self.author) && has_text(&self.song)
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

/// Accepts `"1975"`, `1975` or `null`
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Successfully recognized file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedRecord {
    pub source: SourceFile,
    pub metadata: TrackMetadata,
}

impl RecognizedRecord {
    pub fn new(source: SourceFile, metadata: TrackMetadata) -> Self {
        Self { source, metadata }
    }
}

/// Classified result of one recognition attempt
///
/// Produced exactly once per source file by the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// Backend returned usable metadata
    Recognized(RecognizedRecord),
    /// Backend answered but found no match
    Unrecognized { source: SourceFile, reason: String },
    /// Transport/backend failure, timeout or malformed response
    Errored { source: SourceFile, message: String },
}

impl RecognitionOutcome {
    pub fn source(&self) -> &SourceFile {
        match self {
            RecognitionOutcome::Recognized(record) => &record.source,
            RecognitionOutcome::Unrecognized { source, .. } => source,
            RecognitionOutcome::Errored { source, .. } => source,
        }
    }

    /// Short status label used in progress lines
    pub fn status(&self) -> &'static str {
        match self {
            RecognitionOutcome::Recognized(_) => "OK",
            RecognitionOutcome::Unrecognized { .. } => "NO_MATCH",
            RecognitionOutcome::Errored { .. } => "ERROR",
        }
    }
}

/// One line of the error log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub file: String,
    pub error: String,
}

/// One line of the unrecognized log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedEntry {
    pub file: PathBuf,
    pub reason: String,
}

/// Accumulated results of a recognition run
///
/// `recognized` keeps completion order, which is the canonical order for the
/// organize stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub recognized: Vec<RecognizedRecord>,
    pub errors: Vec<ErrorEntry>,
    pub unrecognized: Vec<UnrecognizedEntry>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome to the matching sequence
    pub fn push(&mut self, outcome: RecognitionOutcome) {
        match outcome {
            RecognitionOutcome::Recognized(record) => self.recognized.push(record),
            RecognitionOutcome::Unrecognized { source, reason } => {
                self.unrecognized.push(UnrecognizedEntry {
                    file: source.path().to_path_buf(),
                    reason,
                })
            }
            RecognitionOutcome::Errored { source, message } => self.errors.push(ErrorEntry {
                file: source.path().display().to_string(),
                error: message,
            }),
        }
    }

    /// Number of files that reached a terminal outcome
    pub fn total(&self) -> usize {
        self.recognized.len() + self.errors.len() + self.unrecognized.len()
    }
}
