//! Recognition workflow
//!
//! Scan → limit → worker pool (rate limited) → aggregator → dataset and logs.

pub mod aggregator;
pub mod worker_pool;

pub use aggregator::{ArtifactPaths, ResultAggregator};
pub use worker_pool::{PoolReport, PoolSettings, RecognitionWorkerPool};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use songsort_common::SourceFile;

use crate::config::RecognizeConfig;
use crate::error::RecognizeResult;
use crate::services::{FileScanner, RateLimiter, Recognizer};

/// Result of a whole recognition run
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Nothing to process; no artifacts were written
    NoFiles,
    Completed(RunSummary),
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub paths: ArtifactPaths,
    pub report: PoolReport,
}

impl RunSummary {
    /// Final one-line report printed on stdout
    pub fn summary_line(&self) -> String {
        let results = &self.report.results;
        format!(
            "Recognized {} / {} files. Errors: {}. Wrote results to: {}. Unrecognized: {} -> {}. Error log: {}. Legend: {}",
            results.recognized.len(),
            self.report.queued,
            results.errors.len(),
            self.paths.output.display(),
            results.unrecognized.len(),
            self.paths.unrecognized.display(),
            self.paths.errors.display(),
            self.paths.legend.display(),
        )
    }
}

/// Keep the first `limit` files
pub fn apply_limit(mut files: Vec<SourceFile>, limit: Option<usize>) -> Vec<SourceFile> {
    if let Some(limit) = limit {
        files.truncate(limit);
    }
    files
}

/// Run recognition over `config.folder`
pub async fn run_recognition(
    config: &RecognizeConfig,
    recognizer: Arc<dyn Recognizer>,
    cancel: CancellationToken,
) -> RecognizeResult<RunOutcome> {
    let files = FileScanner::new()
        .recursive(config.recursive)
        .scan(&config.folder)?;
    let files = apply_limit(files, config.limit);

    if files.is_empty() {
        info!("No audio files found to process.");
        return Ok(RunOutcome::NoFiles);
    }

    let paths = ArtifactPaths::for_output(&config.output);
    let aggregator = Arc::new(ResultAggregator::new(paths.clone()));
    let limiter = Arc::new(RateLimiter::new(config.delay));
    let pool = RecognitionWorkerPool::new(
        recognizer,
        limiter,
        PoolSettings {
            concurrency: config.concurrency,
            checkpoint_every: config.dump_every,
        },
    );

    let report = pool.run(files, aggregator, cancel).await?;
    Ok(RunOutcome::Completed(RunSummary { paths, report }))
}
