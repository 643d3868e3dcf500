//! Effective organize settings
//!
//! Each value resolves as: command line (or its environment variable) →
//! `[organize]` section of the TOML file → compiled default. The pattern is
//! validated here so a bad one fails before any file is looked at.

use std::fmt;
use std::path::PathBuf;

use songsort_common::config::OrganizeSection;

use crate::error::{OrganizeError, OrganizeResult};
use crate::pattern::{Pattern, DEFAULT_PATTERN};
use crate::planner::{ExistingPolicy, TransferMode, TransferOptions};
use crate::resolver::DEFAULT_DUPLICATE_TOKEN;

pub const DEFAULT_DEST_ROOT: &str = ".";

/// Values given on the command line; `None`/`false` means "not given"
#[derive(Debug, Clone, Default)]
pub struct OrganizeOverrides {
    pub dest_root: Option<PathBuf>,
    pub pattern: Option<String>,
    pub duplicate_token: Option<String>,
    pub drop_unknowns: bool,
    pub on_existing: Option<ExistingPolicy>,
    pub skip_identical: bool,
    pub apply: bool,
    pub move_files: bool,
    pub duplicates_json: Option<PathBuf>,
    pub verbose: bool,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    pub input: PathBuf,
    pub dest_root: PathBuf,
    pub pattern: Pattern,
    pub duplicate_token: String,
    pub drop_unknowns: bool,
    pub transfer: TransferOptions,
    pub duplicates_json: Option<PathBuf>,
    /// Print per-file plan lines
    pub verbose: bool,
}

impl OrganizeConfig {
    /// Merge command line, config file and defaults
    pub fn resolve(
        input: PathBuf,
        cli: OrganizeOverrides,
        file: &OrganizeSection,
    ) -> OrganizeResult<Self> {
        let pattern_text = cli
            .pattern
            .or_else(|| file.pattern.clone())
            .unwrap_or_else(|| DEFAULT_PATTERN.to_string());
        let pattern = Pattern::parse(&pattern_text)?;

        let duplicate_token = cli
            .duplicate_token
            .or_else(|| file.duplicate_token.clone())
            .unwrap_or_else(|| DEFAULT_DUPLICATE_TOKEN.to_string());
        if duplicate_token.is_empty() || duplicate_token.contains(['/', '\\']) {
            return Err(OrganizeError::InvalidConfig(format!(
                "duplicate token must be non-empty and contain no path separators, got '{}'",
                duplicate_token
            )));
        }

        let on_existing = match (cli.on_existing, file.on_existing.as_deref()) {
            (Some(policy), _) => policy,
            (None, Some(text)) => text
                .parse()
                .map_err(|e| OrganizeError::InvalidConfig(format!("on_existing: {}", e)))?,
            (None, None) => ExistingPolicy::default(),
        };

        Ok(Self {
            input,
            dest_root: cli
                .dest_root
                .or_else(|| file.dest_root.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEST_ROOT)),
            pattern,
            duplicate_token,
            drop_unknowns: cli.drop_unknowns || file.drop_unknowns.unwrap_or(false),
            transfer: TransferOptions {
                mode: if cli.move_files {
                    TransferMode::Move
                } else {
                    TransferMode::Copy
                },
                apply: cli.apply,
                on_existing,
                skip_identical: cli.skip_identical || file.skip_identical.unwrap_or(false),
            },
            duplicates_json: cli.duplicates_json,
            verbose: cli.verbose,
        })
    }
}

/// One-line rendering of the compiled defaults
pub fn defaults_line() -> String {
    format!(
        "dest_root={}, pattern={}, duplicate_token={}, drop_unknowns=false, on_existing={}, skip_identical=false, mode={}, apply=false",
        DEFAULT_DEST_ROOT,
        DEFAULT_PATTERN,
        DEFAULT_DUPLICATE_TOKEN,
        ExistingPolicy::default(),
        TransferMode::default(),
    )
}

impl fmt::Display for OrganizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input={}, dest_root={}, pattern={}, duplicate_token={}, drop_unknowns={}, on_existing={}, skip_identical={}, mode={}, apply={}",
            self.input.display(),
            self.dest_root.display(),
            self.pattern,
            self.duplicate_token,
            self.drop_unknowns,
            self.transfer.on_existing,
            self.transfer.skip_identical,
            self.transfer.mode,
            self.transfer.apply,
        )
    }
}
