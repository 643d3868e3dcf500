//! Duplicates manifest
//!
//! JSON report of every duplicate group: the collided base path, each member's
//! source, final destination and transfer status.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use songsort_common::dataset::atomic_write_json;

use crate::planner::{TransferMode, TransferRecord, TransferStatus};
use crate::resolver::Resolution;

pub const DUPLICATES_SCHEMA_URL: &str = "https://example.com/schemas/duplicates.schema.json";

#[derive(Debug, Clone, Serialize)]
pub struct DuplicatesManifest {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub generated_at: DateTime<Utc>,
    pub apply: bool,
    pub mode: String,
    pub dest_root: String,
    pub pattern: String,
    pub duplicate_token: String,
    pub groups: Vec<ManifestGroup>,
    pub stats: ManifestStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestGroup {
    pub dest_key: String,
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub src: String,
    pub dest: String,
    pub status: TransferStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestStats {
    pub duplicate_groups: usize,
    pub total_duplicates: usize,
    pub identical_duplicates_skipped: usize,
    pub distinct_duplicates_kept: usize,
}

/// Run parameters echoed into the manifest
#[derive(Debug, Clone, Copy)]
pub struct ManifestContext<'a> {
    pub apply: bool,
    pub mode: TransferMode,
    pub dest_root: &'a Path,
    pub pattern: &'a str,
    pub duplicate_token: &'a str,
}

impl DuplicatesManifest {
    pub fn build(
        context: ManifestContext<'_>,
        resolution: &Resolution,
        transfers: &[TransferRecord],
    ) -> Self {
        let by_source: HashMap<&PathBuf, &TransferRecord> =
            transfers.iter().map(|t| (&t.source, t)).collect();

        let mut stats = ManifestStats {
            duplicate_groups: resolution.groups.len(),
            total_duplicates: resolution.total_duplicates(),
            ..Default::default()
        };

        let groups = resolution
            .groups
            .iter()
            .map(|group| {
                let entries = group
                    .members
                    .iter()
                    .enumerate()
                    .map(|(position, member)| {
                        let transfer = by_source.get(&member.source);
                        let status = transfer
                            .map(|t| t.status)
                            .unwrap_or(TransferStatus::Planned);
                        if position > 0 && status == TransferStatus::SkippedIdentical {
                            stats.identical_duplicates_skipped += 1;
                        }
                        ManifestEntry {
                            src: member.source.display().to_string(),
                            dest: transfer
                                .map(|t| t.destination.display().to_string())
                                .unwrap_or_else(|| member.destination.clone()),
                            status,
                        }
                    })
                    .collect();
                ManifestGroup {
                    dest_key: group.key.clone(),
                    entries,
                }
            })
            .collect();

        stats.distinct_duplicates_kept =
            stats.total_duplicates - stats.identical_duplicates_skipped;

        Self {
            schema: DUPLICATES_SCHEMA_URL.to_string(),
            generated_at: Utc::now(),
            apply: context.apply,
            mode: context.mode.to_string(),
            dest_root: context.dest_root.display().to_string(),
            pattern: context.pattern.to_string(),
            duplicate_token: context.duplicate_token.to_string(),
            groups,
            stats,
        }
    }

    /// Write atomically, creating parent directories
    pub fn write(&self, path: &Path) -> songsort_common::Result<()> {
        atomic_write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DuplicateGroup, GroupMember};

    fn member(src: &str, dest: &str) -> GroupMember {
        GroupMember {
            source: PathBuf::from(src),
            destination: dest.to_string(),
        }
    }

    fn transfer(src: &str, dest: &str, status: TransferStatus) -> TransferRecord {
        TransferRecord {
            source: PathBuf::from(src),
            destination: PathBuf::from("/dest").join(dest),
            relative: dest.to_string(),
            status,
            error: None,
        }
    }

    #[test]
    fn test_manifest_groups_and_stats() {
        let resolution = Resolution {
            assignments: Vec::new(),
            groups: vec![DuplicateGroup {
                key: "Q/T.mp3".to_string(),
                members: vec![
                    member("/in/a.mp3", "Q/T.mp3"),
                    member("/in/b.mp3", "Q/T_duplicate_b.mp3"),
                    member("/in/c.mp3", "Q/T_duplicate_c.mp3"),
                ],
            }],
        };
        let transfers = vec![
            transfer("/in/a.mp3", "Q/T.mp3", TransferStatus::Copied),
            transfer("/in/b.mp3", "Q/T_duplicate_b.mp3", TransferStatus::SkippedIdentical),
            transfer("/in/c.mp3", "Q/T_duplicate_c.mp3", TransferStatus::Copied),
        ];
        let context = ManifestContext {
            apply: true,
            mode: TransferMode::Copy,
            dest_root: Path::new("/dest"),
            pattern: "%A/%S",
            duplicate_token: "_duplicate_",
        };

        let manifest = DuplicatesManifest::build(context, &resolution, &transfers);
        assert_eq!(
            manifest.stats,
            ManifestStats {
                duplicate_groups: 1,
                total_duplicates: 2,
                identical_duplicates_skipped: 1,
                distinct_duplicates_kept: 1,
            }
        );

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["$schema"], DUPLICATES_SCHEMA_URL);
        assert_eq!(json["mode"], "COPY");
        assert_eq!(json["apply"], true);
        assert_eq!(json["groups"][0]["dest_key"], "Q/T.mp3");
        assert_eq!(json["groups"][0]["entries"][1]["status"], "skipped-identical");
        assert_eq!(json["groups"][0]["entries"][2]["src"], "/in/c.mp3");
    }
}
