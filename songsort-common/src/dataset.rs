//! Results dataset persistence
//!
//! The dataset is a JSON object: a `$schema` marker followed by one entry per
//! recognized source path, in completion order. Only recognized records are
//! ever written here; errors and unrecognized files live in companion logs.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::{RecognizedRecord, SourceFile, TrackMetadata};
use crate::{Error, Result};

/// Schema marker stored under `$schema` in the results dataset
pub const RESULTS_SCHEMA_URL: &str = "https://example.com/schemas/recognized.schema.json";

const SCHEMA_KEY: &str = "$schema";

/// Fields that carry a derived `<field>_unknown` flag
const FLAGGED_FIELDS: [&str; 3] = ["author", "album", "song"];

/// Atomically write JSON to `path` via a temp file + rename
///
/// Parent directories are created when missing. Readers never observe a
/// partially written file.
pub fn atomic_write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut file, data)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Build the dataset document for `records`
pub fn results_document(records: &[RecognizedRecord]) -> Result<Value> {
    let mut doc = Map::new();
    doc.insert(SCHEMA_KEY.to_string(), Value::String(RESULTS_SCHEMA_URL.to_string()));

    for record in records {
        let mut entry = match serde_json::to_value(&record.metadata)? {
            Value::Object(map) => map,
            _ => return Err(Error::Internal("metadata did not serialize to an object".to_string())),
        };
        for field in FLAGGED_FIELDS {
            let unknown = entry
                .get(field)
                .and_then(Value::as_str)
                .map(|s| s.trim().is_empty())
                .unwrap_or(true);
            entry.insert(format!("{field}_unknown"), Value::Bool(unknown));
        }
        doc.insert(record.source.path().display().to_string(), Value::Object(entry));
    }

    Ok(Value::Object(doc))
}

/// Persist `records` as the results dataset at `path`
pub fn write_results(path: &Path, records: &[RecognizedRecord]) -> Result<()> {
    let doc = results_document(records)?;
    atomic_write_json(path, &doc)
}

/// Load a results dataset, preserving entry order
///
/// Entries whose value is not an object are skipped with a warning. A
/// `<field>_unknown: true` flag clears the corresponding field.
pub fn load_results(path: &Path) -> Result<Vec<RecognizedRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("Input file not found: {}", path.display())));
    }
    let content = fs::read_to_string(path)?;
    parse_results(&content)
}

/// Parse dataset text (see [`load_results`])
pub fn parse_results(content: &str) -> Result<Vec<RecognizedRecord>> {
    let doc: Value = serde_json::from_str(content)?;
    let Value::Object(entries) = doc else {
        return Err(Error::InvalidInput(
            "Mapping must be a JSON object mapping absolute paths to metadata".to_string(),
        ));
    };

    let mut records = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        if key == SCHEMA_KEY {
            continue;
        }
        let Value::Object(obj) = value else {
            warn!(source = %key, "Skipping malformed dataset entry");
            continue;
        };

        let unknown = |field: &str| {
            obj.get(&format!("{field}_unknown"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        let (author_unknown, album_unknown, song_unknown) =
            (unknown("author"), unknown("album"), unknown("song"));

        let mut metadata: TrackMetadata = match serde_json::from_value(Value::Object(obj)) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(source = %key, error = %e, "Skipping unreadable dataset entry");
                continue;
            }
        };
        if author_unknown {
            metadata.author = None;
        }
        if album_unknown {
            metadata.album = None;
        }
        if song_unknown {
            metadata.song = None;
        }

        records.push(RecognizedRecord::new(SourceFile::new(key), metadata));
    }

    Ok(records)
}
