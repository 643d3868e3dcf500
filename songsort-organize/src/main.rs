//! songsort-organize - library reorganization entry point
//!
//! Reads a recognition results dataset and copies or moves each file to a
//! path rendered from its metadata. Dry-run unless `--apply` is given.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{error, info};

use songsort_common::config::{load_toml_config, TomlConfig};
use songsort_common::logging::init_tracing;
use songsort_organize::config::{defaults_line, OrganizeConfig, OrganizeOverrides};
use songsort_organize::organizer::run_organize;
use songsort_organize::planner::ExistingPolicy;
use songsort_organize::OrganizeError;

/// Command-line arguments for songsort-organize
#[derive(Parser, Debug)]
#[command(name = "songsort-organize")]
#[command(about = "Organize recognized songs into a metadata-based folder layout")]
#[command(version)]
struct Args {
    /// Results dataset written by songsort-recognize
    #[arg(short, long)]
    input: PathBuf,

    /// Destination root [default: .]
    #[arg(short, long, env = "SONGSORT_DEST_ROOT")]
    dest_root: Option<PathBuf>,

    /// Destination pattern, e.g. "%A/%L/%S" [default: %A/%L/%S]
    #[arg(short, long, env = "SONGSORT_PATTERN")]
    pattern: Option<String>,

    /// Perform the transfers (default is a dry run)
    #[arg(long)]
    apply: bool,

    /// Move instead of copy
    #[arg(long = "move")]
    move_files: bool,

    /// Print per-file plan lines; -vv also raises log verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Write a JSON manifest of duplicate groups to this path
    #[arg(long, value_name = "PATH")]
    duplicates_json: Option<PathBuf>,

    /// Omit path segments whose placeholder has no value instead of using "Unknown"
    #[arg(long)]
    drop_unknowns: bool,

    /// Marker between the rendered name and the source stem for duplicates [default: _duplicate_]
    #[arg(long, value_name = "TOKEN")]
    duplicate_token: Option<String>,

    /// What to do when a destination already exists: skip or error [default: skip]
    #[arg(long, value_name = "POLICY")]
    on_existing: Option<ExistingPolicy>,

    /// Do not transfer a duplicate whose content equals the first file of its group
    #[arg(long)]
    skip_identical: bool,

    /// Config file (TOML)
    #[arg(long, env = "SONGSORT_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let toml_config = load_toml_config(args.config.as_deref());
    let level = toml_config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(args.verbose.saturating_sub(1), &level).context("Failed to initialize logging")?;
    let toml_config: TomlConfig = match toml_config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    let overrides = OrganizeOverrides {
        dest_root: args.dest_root,
        pattern: args.pattern,
        duplicate_token: args.duplicate_token,
        drop_unknowns: args.drop_unknowns,
        on_existing: args.on_existing,
        skip_identical: args.skip_identical,
        apply: args.apply,
        move_files: args.move_files,
        duplicates_json: args.duplicates_json,
        verbose: args.verbose > 0,
    };
    let mut config = match OrganizeConfig::resolve(args.input, overrides, &toml_config.organize) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::from(2));
        }
    };
    config.dest_root = absolute(&config.dest_root).context("Failed to resolve destination root")?;

    info!("Defaults -> {}", defaults_line());
    info!("Effective -> {}", config);

    let report = match run_organize(&config) {
        Ok(report) => report,
        Err(OrganizeError::Common(e)) => {
            error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("Organize run failed"),
    };

    if config.verbose {
        println!("Destination root: {}", config.dest_root.display());
        println!("Pattern: {}", config.pattern);
        println!("Mode: {}", config.transfer.mode);
        println!(
            "Apply: {}",
            if config.transfer.apply { "YES" } else { "NO (dry-run)" }
        );
        for line in report.transfer_lines() {
            println!("{}", line);
        }
    }

    print!("{}", report.summary_text(&config.dest_root));

    if let Some(path) = &config.duplicates_json {
        report
            .manifest(&config)
            .write(path)
            .with_context(|| format!("Failed to write duplicates manifest {}", path.display()))?;
        info!("Wrote duplicates manifest to {}", path.display());
    }

    if report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
