//! songsort-recognize - batch recognition entry point
//!
//! Scans a folder for audio files, recognizes each through an external
//! recognizer program and writes the results dataset plus error and
//! unrecognized logs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use songsort_common::config::{load_toml_config, TomlConfig};
use songsort_common::logging::init_tracing;
use songsort_recognize::config::{defaults_line, RecognizeConfig, RecognizeOverrides};
use songsort_recognize::services::{CommandRecognizer, ScanError};
use songsort_recognize::workflow::{run_recognition, RunOutcome};
use songsort_recognize::RecognizeError;

/// Command-line arguments for songsort-recognize
#[derive(Parser, Debug)]
#[command(name = "songsort-recognize")]
#[command(about = "Batch recognize songs in a folder through an external recognizer")]
#[command(version)]
struct Args {
    /// Folder containing audio files to scan
    folder: PathBuf,

    /// Output JSON file [default: recognized-songs.json]
    #[arg(short, long, env = "SONGSORT_OUTPUT")]
    output: Option<PathBuf>,

    /// Process only the first N files
    #[arg(long)]
    limit: Option<usize>,

    /// Write partial results every N processed files (0 disables)
    #[arg(long, value_name = "N", env = "SONGSORT_DUMP_EVERY")]
    dump_every: Option<usize>,

    /// Minimum seconds between recognizer calls across all workers [default: 1.5]
    #[arg(long, env = "SONGSORT_DELAY")]
    delay: Option<f64>,

    /// Max concurrent recognitions, still paced by --delay [default: 1]
    #[arg(short, long, env = "SONGSORT_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Scan only the top level of the folder
    #[arg(long)]
    non_recursive: bool,

    /// Recognizer program, called as `<program> [args...] <file>` [default: recognize-one]
    #[arg(long, env = "SONGSORT_RECOGNIZER")]
    recognizer_command: Option<String>,

    /// Extra argument passed to the recognizer before the file (repeatable)
    #[arg(long = "recognizer-arg", value_name = "ARG", allow_hyphen_values = true)]
    recognizer_args: Vec<String>,

    /// Per-file recognizer timeout in seconds [default: 120]
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Config file (TOML)
    #[arg(long, env = "SONGSORT_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let toml_config = load_toml_config(args.config.as_deref());
    let level = toml_config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(args.verbose, &level).context("Failed to initialize logging")?;
    let toml_config: TomlConfig = match toml_config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    let Some(folder) = resolve_folder(&args.folder) else {
        error!(
            "Folder does not exist or is not a directory: {}",
            args.folder.display()
        );
        return Ok(ExitCode::from(2));
    };

    let overrides = RecognizeOverrides {
        output: args.output,
        limit: args.limit,
        dump_every: args.dump_every,
        delay_secs: args.delay,
        concurrency: args.concurrency,
        non_recursive: args.non_recursive,
        recognizer_command: args.recognizer_command,
        recognizer_args: args.recognizer_args,
        timeout_secs: args.timeout,
    };
    let mut config = match RecognizeConfig::resolve(folder, overrides, &toml_config.recognize) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::from(2));
        }
    };
    config.output = absolute(&config.output).context("Failed to resolve output path")?;

    info!("Defaults -> {}", defaults_line());
    info!("Effective -> {}", config);

    let recognizer = Arc::new(CommandRecognizer::new(
        config.recognizer_command.clone(),
        config.recognizer_args.clone(),
        config.timeout,
    ));

    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupt(cancel.clone()));

    match run_recognition(&config, recognizer, cancel).await {
        Ok(RunOutcome::NoFiles) => Ok(ExitCode::SUCCESS),
        Ok(RunOutcome::Completed(summary)) => {
            println!("{}", summary.summary_line());
            if summary.report.cancelled {
                info!("Interrupted by user.");
                Ok(ExitCode::from(130))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Err(RecognizeError::Scan(
            ScanError::PathNotFound(path) | ScanError::NotADirectory(path),
        )) => {
            error!("Folder does not exist or is not a directory: {}", path.display());
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e).context("Recognition run failed"),
    }
}

fn resolve_folder(folder: &Path) -> Option<PathBuf> {
    let folder = std::fs::canonicalize(folder).ok()?;
    folder.is_dir().then_some(folder)
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Ctrl+C stops new work; in-flight files finish and results are finalized
async fn watch_interrupt(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("Interrupt received, finishing in-flight files");
            cancel.cancel();
        }
        Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
    }
}
