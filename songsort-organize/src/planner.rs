//! Copy/move planning and execution
//!
//! Dry-run (the default) only inspects the filesystem. Apply creates missing
//! parent directories and copies or moves each file. Existing destinations are
//! never overwritten. Failures are recorded per file and the remaining
//! transfers continue.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, error, warn};

use crate::error::TransferError;
use crate::hashing::{files_identical, sha256_file};
use crate::resolver::ResolvedAssignment;

/// Copy or move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransferMode::Copy => "COPY",
            TransferMode::Move => "MOVE",
        })
    }
}

/// What to do when the destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingPolicy {
    #[default]
    Skip,
    Error,
}

impl FromStr for ExistingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(ExistingPolicy::Skip),
            "error" => Ok(ExistingPolicy::Error),
            other => Err(format!("expected 'skip' or 'error', got '{}'", other)),
        }
    }
}

impl fmt::Display for ExistingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExistingPolicy::Skip => "skip",
            ExistingPolicy::Error => "error",
        })
    }
}

/// Result for one assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferStatus {
    Planned,
    Copied,
    Moved,
    InPlace,
    SkippedExists,
    SkippedIdentical,
    MissingSource,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Planned => "planned",
            TransferStatus::Copied => "copied",
            TransferStatus::Moved => "moved",
            TransferStatus::InPlace => "in-place",
            TransferStatus::SkippedExists => "skipped-exists",
            TransferStatus::SkippedIdentical => "skipped-identical",
            TransferStatus::MissingSource => "missing-source",
            TransferStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Planned or performed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub source: PathBuf,
    /// Destination root joined with the relative destination
    pub destination: PathBuf,
    pub relative: String,
    pub status: TransferStatus,
    pub error: Option<String>,
}

/// Planner switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferOptions {
    pub mode: TransferMode,
    pub apply: bool,
    pub on_existing: ExistingPolicy,
    /// Skip a duplicate whose content equals the first file of its group
    pub skip_identical: bool,
}

/// Turns resolved assignments into filesystem actions
#[derive(Debug, Clone)]
pub struct FileTransferPlanner {
    dest_root: PathBuf,
    options: TransferOptions,
}

impl FileTransferPlanner {
    pub fn new(dest_root: impl Into<PathBuf>, options: TransferOptions) -> Self {
        Self {
            dest_root: dest_root.into(),
            options,
        }
    }

    /// Destination for a relative `/`-separated path
    pub fn destination_for(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.dest_root.clone(), |path, part| path.join(part))
    }

    /// Process every assignment in order
    pub fn execute(&self, assignments: &[ResolvedAssignment]) -> Vec<TransferRecord> {
        // Compared up front: a move would take the first file of a group away
        let identical = if self.options.skip_identical {
            identical_duplicates(assignments)
        } else {
            HashSet::new()
        };

        assignments
            .iter()
            .enumerate()
            .map(|(index, a)| self.execute_one(a, identical.contains(&index)))
            .collect()
    }

    fn execute_one(
        &self,
        assignment: &ResolvedAssignment,
        identical_duplicate: bool,
    ) -> TransferRecord {
        let source = assignment.source.path().to_path_buf();
        let destination = self.destination_for(&assignment.destination);
        let record = |status: TransferStatus, error: Option<String>| TransferRecord {
            source: source.clone(),
            destination: destination.clone(),
            relative: assignment.destination.clone(),
            status,
            error,
        };

        if !source.is_file() {
            warn!(source = %source.display(), "Source file missing, skipping");
            return record(TransferStatus::MissingSource, None);
        }

        if same_file(&source, &destination) {
            debug!(source = %source.display(), "Already in place");
            return record(TransferStatus::InPlace, None);
        }

        if identical_duplicate {
            debug!(source = %source.display(), "Identical duplicate, skipping");
            return record(TransferStatus::SkippedIdentical, None);
        }

        // Checked immediately before the transfer; nothing is ever overwritten
        if destination.exists() {
            if matches!(files_identical(&source, &destination), Ok(true)) {
                return record(TransferStatus::SkippedIdentical, None);
            }
            return match self.options.on_existing {
                ExistingPolicy::Skip => {
                    warn!(destination = %destination.display(), "Destination exists, skipping");
                    record(TransferStatus::SkippedExists, None)
                }
                ExistingPolicy::Error => {
                    let err = TransferError::DestinationExists(destination.clone());
                    error!(source = %source.display(), error = %err, "Transfer refused");
                    record(TransferStatus::Failed, Some(err.to_string()))
                }
            };
        }

        if !self.options.apply {
            return record(TransferStatus::Planned, None);
        }

        let result = match self.options.mode {
            TransferMode::Copy => copy_file(&source, &destination).map(|_| TransferStatus::Copied),
            TransferMode::Move => move_file(&source, &destination).map(|_| TransferStatus::Moved),
        };
        match result {
            Ok(status) => record(status, None),
            Err(e) => {
                error!(source = %source.display(), error = %e, "Transfer failed");
                record(TransferStatus::Failed, Some(e.to_string()))
            }
        }
    }
}

/// Indices of duplicates whose content equals the first file of their group
fn identical_duplicates(assignments: &[ResolvedAssignment]) -> HashSet<usize> {
    let mut hashes: HashMap<PathBuf, Option<String>> = HashMap::new();
    let mut hash = |path: &Path| -> Option<String> {
        hashes
            .entry(path.to_path_buf())
            .or_insert_with(|| match sha256_file(path) {
                Ok(digest) => Some(digest),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not hash file");
                    None
                }
            })
            .clone()
    };

    let mut identical = HashSet::new();
    for (index, assignment) in assignments.iter().enumerate() {
        let Some(first) = &assignment.duplicate_of else {
            continue;
        };
        let (Some(a), Some(b)) = (hash(assignment.source.path()), hash(first.as_path())) else {
            continue;
        };
        if a == b {
            identical.insert(index);
        }
    }
    identical
}

fn same_file(source: &Path, destination: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn ensure_parent(destination: &Path) -> Result<(), TransferError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| TransferError::io("create", parent, e))?;
    }
    Ok(())
}

/// Copy through `<dest>.incoming` and rename into place
fn copy_file(source: &Path, destination: &Path) -> Result<(), TransferError> {
    ensure_parent(destination)?;

    let mut temp = destination.as_os_str().to_owned();
    temp.push(".incoming");
    let temp = PathBuf::from(temp);
    if temp.exists() {
        let _ = fs::remove_file(&temp);
    }

    if let Err(e) = fs::copy(source, &temp) {
        let _ = fs::remove_file(&temp);
        return Err(TransferError::io("copy", source, e));
    }
    fs::rename(&temp, destination).map_err(|e| {
        let _ = fs::remove_file(&temp);
        TransferError::io("rename", &temp, e)
    })
}

/// Rename, falling back to copy + remove across filesystems
///
/// Any other rename failure is reported as is. When the source cannot be
/// removed after the fallback copy, the copy is deleted again so the source
/// stays the only instance.
fn move_file(source: &Path, destination: &Path) -> Result<(), TransferError> {
    ensure_parent(destination)?;

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) if is_cross_device(&rename_err) => {
            debug!(
                source = %source.display(),
                error = %rename_err,
                "Rename crosses devices, falling back to copy and remove"
            );
            copy_file(source, destination)?;
            fs::remove_file(source).map_err(|e| {
                if let Err(cleanup) = fs::remove_file(destination) {
                    warn!(
                        destination = %destination.display(),
                        error = %cleanup,
                        "Could not remove copy after failed move"
                    );
                }
                TransferError::io("remove", source, e)
            })
        }
        Err(rename_err) => Err(TransferError::io("move", source, rename_err)),
    }
}

/// EXDEV on unix, ERROR_NOT_SAME_DEVICE on windows
fn is_cross_device(err: &io::Error) -> bool {
    const CROSS_DEVICE: i32 = if cfg!(windows) { 17 } else { 18 };
    err.raw_os_error() == Some(CROSS_DEVICE)
}
