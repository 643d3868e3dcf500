//! Collision-free destination assignment
//!
//! Records are consumed in dataset order (first completed, first seen). The
//! first record to render a path keeps it; later ones get the duplicate token
//! plus their own source stem, then `_2`, `_3`, ... until the path is free.
//! Paths compare case-insensitively. Every assigned path is registered in the
//! seen-set before the next record is looked at, so destinations are pairwise
//! distinct by construction.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use songsort_common::SourceFile;

use crate::pattern::{sanitize_component, RenderedPath};

/// Default marker inserted between the rendered name and the source stem
pub const DEFAULT_DUPLICATE_TOKEN: &str = "_duplicate_";

/// Final destination for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAssignment {
    pub source: SourceFile,
    /// Rendered path plus extension, before disambiguation
    pub base: String,
    /// Unique relative destination
    pub destination: String,
    /// First source that rendered the same base, when this one is a duplicate
    pub duplicate_of: Option<PathBuf>,
}

impl ResolvedAssignment {
    /// True when the destination differs from the rendered base
    pub fn is_renamed(&self) -> bool {
        self.destination != self.base
    }
}

/// Member of a duplicate group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub source: PathBuf,
    pub destination: String,
}

/// Sources that rendered the same base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// The collided base path, as first rendered
    pub key: String,
    pub members: Vec<GroupMember>,
}

/// Resolver output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub assignments: Vec<ResolvedAssignment>,
    /// Groups with two or more members, in first-seen order
    pub groups: Vec<DuplicateGroup>,
}

impl Resolution {
    /// Files beyond the first in each group
    pub fn total_duplicates(&self) -> usize {
        self.groups.iter().map(|g| g.members.len() - 1).sum()
    }

    /// Number of distinct rendered bases
    pub fn unique_bases(&self) -> usize {
        self.assignments
            .iter()
            .map(|a| a.base.to_lowercase())
            .collect::<HashSet<_>>()
            .len()
    }
}

/// Deterministic duplicate resolver
#[derive(Debug, Clone)]
pub struct DuplicateResolver {
    token: String,
}

impl DuplicateResolver {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Assign destinations for `(source, rendered)` pairs in input order
    pub fn resolve<I>(&self, items: I) -> Resolution
    where
        I: IntoIterator<Item = (SourceFile, RenderedPath)>,
    {
        let mut assigned: HashSet<String> = HashSet::new();
        // lowercased base -> (index into `groups`, first source)
        let mut group_index: HashMap<String, (usize, PathBuf)> = HashMap::new();
        let mut groups: Vec<DuplicateGroup> = Vec::new();
        let mut assignments = Vec::new();

        for (source, rendered) in items {
            let ext = source.extension().to_string();
            let base = format!("{}{}", rendered.as_str(), ext);
            let base_key = base.to_lowercase();

            let duplicate_of = group_index.get(&base_key).map(|(_, first)| first.clone());
            let destination = if duplicate_of.is_none() && !assigned.contains(&base_key) {
                base.clone()
            } else {
                let stem = format!(
                    "{}{}{}",
                    rendered.as_str(),
                    self.token,
                    sanitize_component(&source.stem())
                );
                first_free(&stem, &ext, &assigned)
            };
            assigned.insert(destination.to_lowercase());

            let member = GroupMember {
                source: source.path().to_path_buf(),
                destination: destination.clone(),
            };
            match group_index.get(&base_key) {
                Some((index, _)) => groups[*index].members.push(member),
                None => {
                    group_index.insert(base_key, (groups.len(), source.path().to_path_buf()));
                    groups.push(DuplicateGroup {
                        key: base.clone(),
                        members: vec![member],
                    });
                }
            }

            assignments.push(ResolvedAssignment {
                source,
                base,
                destination,
                duplicate_of,
            });
        }

        groups.retain(|g| g.members.len() > 1);
        Resolution {
            assignments,
            groups,
        }
    }
}

impl Default for DuplicateResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DUPLICATE_TOKEN)
    }
}

/// `stem + ext`, else `stem_2 + ext`, `stem_3 + ext`, ...
///
/// Terminates because `assigned` is finite.
fn first_free(stem: &str, ext: &str, assigned: &HashSet<String>) -> String {
    let candidate = format!("{stem}{ext}");
    if !assigned.contains(&candidate.to_lowercase()) {
        return candidate;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{stem}_{n}{ext}");
        if !assigned.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
