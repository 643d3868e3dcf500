//! Bounded-concurrency recognition workers
//!
//! Up to `concurrency` tokio tasks pop files from a shared queue, wait for the
//! rate limiter, call the recognizer and hand the classified outcome to the
//! aggregator. A failing file never stops the pool, including a recognizer
//! that panics: each call runs in its own task and a panic is recorded as an
//! error for that file. Cancellation stops workers from taking new files;
//! calls already in flight run to completion.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use songsort_common::{RecognitionOutcome, ResultSet, SourceFile};

use super::aggregator::ResultAggregator;
use crate::error::RecognizeResult;
use crate::services::{classify, RateLimiter, Recognition, Recognizer, RecognizerError};

/// Pool tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum concurrent recognizer calls (at least 1)
    pub concurrency: usize,
    /// Checkpoint after every N completed files
    pub checkpoint_every: Option<usize>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            checkpoint_every: None,
        }
    }
}

/// What a pool run produced
#[derive(Debug, Clone)]
pub struct PoolReport {
    pub results: ResultSet,
    /// Files handed to the pool
    pub queued: usize,
    /// Set when the run stopped early on cancellation
    pub cancelled: bool,
}

/// Recognition worker pool
pub struct RecognitionWorkerPool {
    recognizer: Arc<dyn Recognizer>,
    limiter: Arc<RateLimiter>,
    settings: PoolSettings,
}

struct WorkerContext {
    queue: Mutex<VecDeque<SourceFile>>,
    recognizer: Arc<dyn Recognizer>,
    limiter: Arc<RateLimiter>,
    aggregator: Arc<ResultAggregator>,
    cancel: CancellationToken,
    total: usize,
    checkpoint_every: Option<usize>,
}

impl RecognitionWorkerPool {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        limiter: Arc<RateLimiter>,
        settings: PoolSettings,
    ) -> Self {
        Self {
            recognizer,
            limiter,
            settings,
        }
    }

    /// Process `files` until the queue drains or `cancel` fires, then finalize
    pub async fn run(
        &self,
        files: Vec<SourceFile>,
        aggregator: Arc<ResultAggregator>,
        cancel: CancellationToken,
    ) -> RecognizeResult<PoolReport> {
        let total = files.len();
        let workers = self.settings.concurrency.max(1).min(total.max(1));

        let context = Arc::new(WorkerContext {
            queue: Mutex::new(files.into()),
            recognizer: Arc::clone(&self.recognizer),
            limiter: Arc::clone(&self.limiter),
            aggregator: Arc::clone(&aggregator),
            cancel: cancel.clone(),
            total,
            checkpoint_every: self.settings.checkpoint_every.filter(|n| *n > 0),
        });

        info!(files = total, workers, "Starting recognition");

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let context = Arc::clone(&context);
            set.spawn(async move { run_worker(worker_id, context).await });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Recognition worker failed");
            }
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            let remaining = context.queue.lock().await.len();
            warn!(remaining, "Recognition interrupted, finalizing completed files");
        }

        let results = aggregator.finalize().await?;
        Ok(PoolReport {
            results,
            queued: total,
            cancelled,
        })
    }
}

async fn run_worker(worker_id: usize, ctx: Arc<WorkerContext>) {
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }
        let Some(source) = ctx.queue.lock().await.pop_front() else {
            break;
        };

        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                debug!(worker_id, file = %source, "Cancelled before recognizer call");
                ctx.queue.lock().await.push_front(source);
                break;
            }
            _ = ctx.limiter.acquire() => {}
        }

        let result = recognize_isolated(&ctx.recognizer, &source).await;
        let outcome = classify(source, result);
        let line = progress_detail(&outcome);
        let status = outcome.status();
        let file = outcome.source().to_string();

        let completed = ctx.aggregator.record(outcome).await;
        let percent = if ctx.total > 0 {
            completed as f64 * 100.0 / ctx.total as f64
        } else {
            100.0
        };
        info!(
            "{}/{} ({:.1}%) {}: {}{}",
            completed, ctx.total, percent, status, file, line
        );

        if let Some(every) = ctx.checkpoint_every {
            if completed % every == 0 {
                match ctx.aggregator.checkpoint().await {
                    Ok(entries) => info!(
                        "Checkpoint: wrote {} with {} entries after {}/{} processed.",
                        ctx.aggregator.paths().output.display(),
                        entries,
                        completed,
                        ctx.total
                    ),
                    Err(e) => warn!(
                        error = %e,
                        "Failed to write checkpoint to {}",
                        ctx.aggregator.paths().output.display()
                    ),
                }
            }
        }
    }
    debug!(worker_id, "Worker finished");
}

/// Run one recognizer call in its own task so a panic stays with its file
async fn recognize_isolated(
    recognizer: &Arc<dyn Recognizer>,
    source: &SourceFile,
) -> Result<Recognition, RecognizerError> {
    let recognizer = Arc::clone(recognizer);
    let path = source.path().to_path_buf();
    match tokio::spawn(async move { recognizer.recognize(&path).await }).await {
        Ok(result) => result,
        Err(e) => {
            error!(file = %source, error = %e, "Recognizer call did not complete");
            Err(RecognizerError::Panic(panic_message(e)))
        }
    }
}

fn panic_message(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn progress_detail(outcome: &RecognitionOutcome) -> String {
    match outcome {
        RecognitionOutcome::Recognized(record) => format!(
            " -> {} - {}",
            record.metadata.author.as_deref().unwrap_or("?"),
            record.metadata.song.as_deref().unwrap_or("?")
        ),
        RecognitionOutcome::Unrecognized { reason, .. } => format!(" - {}", reason),
        RecognitionOutcome::Errored { message, .. } => format!(" - {}", message),
    }
}
