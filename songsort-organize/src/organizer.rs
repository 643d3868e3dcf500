//! Organize workflow
//!
//! Load dataset → render each record → resolve duplicates → plan or perform
//! transfers. Runs sequentially in dataset order so the outcome is the same
//! on every run over the same input.

use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

use songsort_common::dataset::load_results;
use songsort_common::RecognizedRecord;

use crate::config::OrganizeConfig;
use crate::error::OrganizeResult;
use crate::manifest::{DuplicatesManifest, ManifestContext};
use crate::pattern::PatternRenderer;
use crate::planner::{
    FileTransferPlanner, TransferMode, TransferOptions, TransferRecord, TransferStatus,
};
use crate::resolver::{DuplicateResolver, Resolution};

/// Missing sources listed in the summary before truncating
const MISSING_LISTED: usize = 50;

/// Everything one organize run decided and did
#[derive(Debug, Clone)]
pub struct OrganizeReport {
    pub total_entries: usize,
    pub resolution: Resolution,
    /// One per assignment, same order
    pub transfers: Vec<TransferRecord>,
    pub options: TransferOptions,
}

/// Counters printed after a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub total_entries: usize,
    pub unique_destinations: usize,
    pub missing_sources: usize,
    pub already_in_place: usize,
    pub duplicate_groups: usize,
    pub total_duplicates: usize,
    pub planned_copies: usize,
    pub planned_moves: usize,
    pub copies_performed: usize,
    pub moves_performed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OrganizeReport {
    pub fn summary(&self) -> OrganizeSummary {
        let count = |status: TransferStatus| {
            self.transfers
                .iter()
                .filter(|t| t.status == status)
                .count()
        };

        let planned = self
            .transfers
            .iter()
            .filter(|t| {
                !matches!(
                    t.status,
                    TransferStatus::MissingSource
                        | TransferStatus::InPlace
                        | TransferStatus::SkippedExists
                        | TransferStatus::SkippedIdentical
                )
            })
            .count();
        let (planned_copies, planned_moves) = match self.options.mode {
            TransferMode::Copy => (planned, 0),
            TransferMode::Move => (0, planned),
        };

        OrganizeSummary {
            total_entries: self.total_entries,
            unique_destinations: self.resolution.unique_bases(),
            missing_sources: count(TransferStatus::MissingSource),
            already_in_place: count(TransferStatus::InPlace),
            duplicate_groups: self.resolution.groups.len(),
            total_duplicates: self.resolution.total_duplicates(),
            planned_copies,
            planned_moves,
            copies_performed: count(TransferStatus::Copied),
            moves_performed: count(TransferStatus::Moved),
            skipped: count(TransferStatus::SkippedExists) + count(TransferStatus::SkippedIdentical),
            failed: count(TransferStatus::Failed),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.transfers.iter().any(|t| t.status == TransferStatus::Failed)
    }

    /// Per-file lines for verbose output
    pub fn transfer_lines(&self) -> Vec<String> {
        let mode = self.options.mode;
        self.transfers
            .iter()
            .filter_map(|t| {
                let (src, dest) = (t.source.display(), t.destination.display());
                match t.status {
                    TransferStatus::Planned => Some(format!("PLAN {mode} {src} -> {dest}")),
                    TransferStatus::Copied | TransferStatus::Moved => {
                        Some(format!("{mode} {src} -> {dest}"))
                    }
                    TransferStatus::InPlace => Some(format!("SKIP already in place: {src}")),
                    _ => None,
                }
            })
            .collect()
    }

    /// Summary block, duplicate listing and missing sources
    pub fn summary_text(&self, dest_root: &Path) -> String {
        let s = self.summary();
        let mut out = String::new();

        // Writing to a String cannot fail
        let _ = writeln!(out, "Summary:");
        let _ = writeln!(out, "  Total JSON entries:     {}", s.total_entries);
        let _ = writeln!(out, "  Unique destinations:    {}", s.unique_destinations);
        let _ = writeln!(out, "  Missing source files:   {}", s.missing_sources);
        let _ = writeln!(out, "  Already in place:       {}", s.already_in_place);
        let _ = writeln!(out, "  Duplicate groups:       {}", s.duplicate_groups);
        let _ = writeln!(out, "  Total duplicate files:  {}", s.total_duplicates);
        let _ = writeln!(out, "  Will copy (planned):    {}", s.planned_copies);
        let _ = writeln!(out, "  Will move (planned):    {}", s.planned_moves);
        if self.options.apply {
            let _ = writeln!(out, "  Copied:                 {}", s.copies_performed);
            let _ = writeln!(out, "  Moved:                  {}", s.moves_performed);
        } else {
            let _ = writeln!(out, "  Mode: DRY-RUN (use --apply to perform operations)");
        }
        let _ = writeln!(out, "  Skipped (existing):     {}", s.skipped);
        let _ = writeln!(out, "  Failed:                 {}", s.failed);

        if !self.resolution.groups.is_empty() {
            let _ = writeln!(out, "\nDuplicates detected and their planned destination names:");
            for group in &self.resolution.groups {
                let _ = writeln!(out, "  - {}:", group.key);
                for (idx, member) in group.members.iter().enumerate() {
                    let _ = writeln!(
                        out,
                        "      {}) {} -> {}",
                        idx + 1,
                        member.source.display(),
                        dest_root.join(&member.destination).display()
                    );
                }
            }
        }

        let missing: Vec<_> = self
            .transfers
            .iter()
            .filter(|t| t.status == TransferStatus::MissingSource)
            .collect();
        if !missing.is_empty() {
            let _ = writeln!(out, "\nMissing sources (skipped):");
            for t in missing.iter().take(MISSING_LISTED) {
                let _ = writeln!(out, "  - {}", t.source.display());
            }
            if missing.len() > MISSING_LISTED {
                let _ = writeln!(out, "  ... and {} more", missing.len() - MISSING_LISTED);
            }
        }

        out
    }

    /// Duplicates manifest for this run
    pub fn manifest(&self, config: &OrganizeConfig) -> DuplicatesManifest {
        let context = ManifestContext {
            apply: self.options.apply,
            mode: self.options.mode,
            dest_root: &config.dest_root,
            pattern: config.pattern.as_str(),
            duplicate_token: &config.duplicate_token,
        };
        DuplicatesManifest::build(context, &self.resolution, &self.transfers)
    }
}

/// Render, resolve and transfer already-loaded records
pub fn organize_records(records: &[RecognizedRecord], config: &OrganizeConfig) -> OrganizeReport {
    let renderer = PatternRenderer::new(config.pattern.clone(), config.drop_unknowns);
    let resolver = DuplicateResolver::new(config.duplicate_token.clone());

    let resolution = resolver.resolve(records.iter().map(|record| {
        let rendered = renderer.render(&record.metadata);
        debug!(source = %record.source, rendered = %rendered, "Rendered destination");
        (record.source.clone(), rendered)
    }));
    for assignment in resolution.assignments.iter().filter(|a| a.is_renamed()) {
        debug!(
            source = %assignment.source,
            base = %assignment.base,
            destination = %assignment.destination,
            "Renamed to avoid collision"
        );
    }
    info!(
        assignments = resolution.assignments.len(),
        duplicate_groups = resolution.groups.len(),
        "Resolved destinations"
    );

    let planner = FileTransferPlanner::new(&config.dest_root, config.transfer);
    let transfers = planner.execute(&resolution.assignments);

    OrganizeReport {
        total_entries: records.len(),
        resolution,
        transfers,
        options: config.transfer,
    }
}

/// Load the dataset named by `config.input` and organize it
pub fn run_organize(config: &OrganizeConfig) -> OrganizeResult<OrganizeReport> {
    let records = load_results(&config.input)?;
    info!(
        "Loaded {} entries from {}",
        records.len(),
        config.input.display()
    );
    Ok(organize_records(&records, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrganizeOverrides;
    use songsort_common::config::OrganizeSection;
    use songsort_common::models::TrackMetadata;
    use songsort_common::SourceFile;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(dest_root: &Path, apply: bool) -> OrganizeConfig {
        OrganizeConfig::resolve(
            PathBuf::from("unused.json"),
            OrganizeOverrides {
                dest_root: Some(dest_root.to_path_buf()),
                apply,
                ..Default::default()
            },
            &OrganizeSection::default(),
        )
        .unwrap()
    }

    fn record(path: &Path, song: &str) -> RecognizedRecord {
        RecognizedRecord::new(
            SourceFile::new(path),
            TrackMetadata {
                author: Some("Queen".to_string()),
                song: Some(song.to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_summary_counts_dry_run() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.mp3");
        let b = dir.path().join("b.mp3");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();
        let records = vec![
            record(&a, "Test"),
            record(&b, "Test"),
            record(&dir.path().join("gone.mp3"), "Other"),
        ];

        let report = organize_records(&records, &config(&dir.path().join("dest"), false));
        let summary = report.summary();
        assert_eq!(summary.total_entries, 3);
        assert_eq!(summary.unique_destinations, 2);
        assert_eq!(summary.missing_sources, 1);
        assert_eq!(summary.duplicate_groups, 1);
        assert_eq!(summary.total_duplicates, 1);
        assert_eq!(summary.planned_copies, 2);
        assert_eq!(summary.copies_performed, 0);

        let text = report.summary_text(&dir.path().join("dest"));
        assert!(text.starts_with("Summary:\n"));
        assert!(text.contains("Mode: DRY-RUN (use --apply to perform operations)"));
        assert!(text.contains("  - Queen/Unknown/Test.mp3:"));
        assert!(text.contains("Missing sources (skipped):"));

        let lines = report.transfer_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.starts_with("PLAN COPY ")));
    }

    #[test]
    fn test_apply_lines_and_counts() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.mp3");
        fs::write(&a, b"a").unwrap();

        let report = organize_records(
            &[record(&a, "Test")],
            &config(&dir.path().join("dest"), true),
        );
        assert_eq!(report.summary().copies_performed, 1);
        assert!(!report.has_failures());
        assert!(report.transfer_lines()[0].starts_with("COPY "));
        assert!(report.summary_text(dir.path()).contains("  Copied:                 1"));
    }
}
