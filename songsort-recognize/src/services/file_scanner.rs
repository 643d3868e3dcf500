//! Audio file scanner
//!
//! Walks a folder (recursively or top-level only) and keeps regular files with
//! an allow-listed audio extension. Results are sorted by path so the work
//! queue order is reproducible.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use songsort_common::extensions::has_audio_extension;
use songsort_common::SourceFile;

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Audio file scanner
pub struct FileScanner {
    ignore_names: Vec<String>,
    recursive: bool,
}

impl FileScanner {
    /// Recursive scanner skipping VCS folders and OS metadata files
    pub fn new() -> Self {
        Self {
            ignore_names: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
            recursive: true,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Scan `root_path` for audio files
    pub fn scan(&self, root_path: &Path) -> Result<Vec<SourceFile>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(root_path)
            .follow_links(true)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e));

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && has_audio_extension(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => {
                    // Unreadable entries and symlink loops do not abort the scan
                    tracing::warn!(error = %e, "Error accessing entry");
                }
            }
        }

        files.sort();
        tracing::debug!(
            root = %root_path.display(),
            recursive = self.recursive,
            files_found = files.len(),
            "Scan complete"
        );

        Ok(files.into_iter().map(SourceFile::new).collect())
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let file_name = entry.file_name().to_string_lossy();
        !self.ignore_names.iter().any(|name| file_name == name.as_str())
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}
