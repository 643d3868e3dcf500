//! Result aggregation and persistence
//!
//! Workers call [`ResultAggregator::record`] concurrently. Persistence always
//! works from a cloned snapshot: the results lock is held only for the clone,
//! while a separate write gate keeps checkpoint and final writes in order so
//! an older snapshot never replaces a newer one on disk.

use chrono::Utc;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use songsort_common::dataset::write_results;
use songsort_common::{Error, RecognitionOutcome, ResultSet};

use crate::error::{RecognizeError, RecognizeResult};

/// Output file plus its companion artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub output: PathBuf,
    pub errors: PathBuf,
    pub unrecognized: PathBuf,
    pub legend: PathBuf,
}

impl ArtifactPaths {
    /// Companions sit next to `output`: `<stem>.errors.jsonl`,
    /// `<stem>.unrecognized.txt`, `<stem>.errors.README.txt`
    pub fn for_output(output: &Path) -> Self {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recognized".to_string());
        let sibling = |suffix: &str| output.with_file_name(format!("{stem}{suffix}"));
        Self {
            output: output.to_path_buf(),
            errors: sibling(".errors.jsonl"),
            unrecognized: sibling(".unrecognized.txt"),
            legend: sibling(".errors.README.txt"),
        }
    }
}

/// Thread-safe accumulator of recognition outcomes
pub struct ResultAggregator {
    results: Mutex<ResultSet>,
    write_gate: Mutex<()>,
    paths: ArtifactPaths,
}

impl ResultAggregator {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            results: Mutex::new(ResultSet::new()),
            write_gate: Mutex::new(()),
            paths,
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Append one outcome; returns the number of completed files
    pub async fn record(&self, outcome: RecognitionOutcome) -> usize {
        let mut results = self.results.lock().await;
        results.push(outcome);
        results.total()
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> ResultSet {
        self.results.lock().await.clone()
    }

    /// Persist the recognized records accumulated so far
    ///
    /// Returns the number of entries written.
    pub async fn checkpoint(&self) -> RecognizeResult<usize> {
        let _gate = self.write_gate.lock().await;
        let recognized = self.results.lock().await.recognized.clone();
        let count = recognized.len();
        let output = self.paths.output.clone();
        blocking(move || write_results(&output, &recognized)).await?;
        Ok(count)
    }

    /// Persist the dataset and write the error log, unrecognized log and legend
    pub async fn finalize(&self) -> RecognizeResult<ResultSet> {
        let _gate = self.write_gate.lock().await;
        let results = self.snapshot().await;
        let snapshot = results.clone();
        let paths = self.paths.clone();
        blocking(move || write_all(&paths, &snapshot)).await?;
        Ok(results)
    }
}

async fn blocking<F>(f: F) -> RecognizeResult<()>
where
    F: FnOnce() -> songsort_common::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RecognizeError::Internal(format!("Persistence task failed: {}", e)))?
        .map_err(RecognizeError::from)
}

fn write_all(paths: &ArtifactPaths, results: &ResultSet) -> songsort_common::Result<()> {
    write_results(&paths.output, &results.recognized)?;

    let mut errors = String::new();
    for entry in &results.errors {
        errors.push_str(&serde_json::to_string(entry)?);
        errors.push('\n');
    }
    std::fs::write(&paths.errors, errors)?;

    let mut unrecognized = String::new();
    for entry in &results.unrecognized {
        writeln!(unrecognized, "{}\t{}", entry.file.display(), entry.reason)
            .map_err(|e| Error::Internal(e.to_string()))?;
    }
    std::fs::write(&paths.unrecognized, unrecognized)?;

    std::fs::write(&paths.legend, legend_text(paths))?;
    Ok(())
}

fn legend_text(paths: &ArtifactPaths) -> String {
    format!(
        "Error log format (JSON Lines): one JSON object per line with keys 'file' and 'error'.\n\
         Legend:\n\
         \x20- ChildExit <code>: the recognizer program exited non-zero. Check the per-file\n\
         \x20  stderr lines (tagged with the source file) logged during processing for details.\n\
         \x20  Common causes: network/transient API errors, decoding issues, or service throttling.\n\
         \x20- ParseError: <detail>: the recognizer printed output that is not a response document.\n\
         \x20  Inspect the tagged stderr lines for context.\n\
         \x20- Timeout after <N>s: the recognizer did not finish within the configured timeout.\n\
         \x20- SpawnError: <detail>: the recognizer program could not be started.\n\
         \x20- Panic: <detail>: the recognizer crashed on this file; remaining files continued.\n\
         \x20- NO_MATCH (unrecognized log): no track match was found for the file.\n\
         \n\
         Artifacts produced by this run ({generated}):\n\
         \x20- Results JSON: {output}\n\
         \x20- Errors JSONL: {errors}\n\
         \x20- Unrecognized TXT: {unrecognized}\n\
         \n\
         Use --delay and --concurrency to tune rate limiting and throughput.\n",
        generated = Utc::now().to_rfc3339(),
        output = paths.output.display(),
        errors = paths.errors.display(),
        unrecognized = paths.unrecognized.display(),
    )
}
