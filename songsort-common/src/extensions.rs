//! Audio extension allow-list
//!
//! Format detection is purely extension based; file content is never inspected.

use std::path::Path;

/// Extensions (lowercase, without dot) treated as audio files
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "ogg", "opus", "wav", "flac", "wma", "mp4", "mkv",
];

/// Check if extension is audio (case-insensitive, with or without leading dot)
pub fn is_audio_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_lowercase();
    AUDIO_EXTENSIONS.contains(&ext.as_str())
}

/// Check if a path carries an allow-listed audio extension
pub fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| is_audio_extension(&ext.to_string_lossy()))
        .unwrap_or(false)
}

/// Lowercase extension of `path` including the leading dot, or empty
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
