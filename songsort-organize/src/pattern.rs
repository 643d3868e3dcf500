//! Destination path patterns
//!
//! A pattern is a `/`-separated template with two-character placeholders:
//!
//! | Token | Field |
//! |-------|-------|
//! | `%A` | artist |
//! | `%L` | album |
//! | `%S` | song title |
//! | `%Y` | release year |
//! | `%G` | primary genre |
//! | `%B` | label |
//! | `%I` | ISRC |
//! | `%E` | `Explicit` or `Clean` |
//! | `%e` | `true` or `false` |
//! | `%a` | artist id |
//! | `%T` | track id |
//! | `%U` | album id |
//!
//! `%%` is a literal percent sign. Any other `%` sequence rejects the pattern.
//! The last segment names the file; the source extension is added later by the
//! duplicate resolver.

use std::fmt;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use songsort_common::models::TrackMetadata;

/// Fallback for missing values and components that sanitize to nothing
pub const UNKNOWN: &str = "Unknown";

/// Default pattern: `<artist>/<album>/<song>`
pub const DEFAULT_PATTERN: &str = "%A/%L/%S";

/// Pattern validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Pattern is empty")]
    Empty,

    #[error("Unknown placeholder '%{token}' at position {position}")]
    UnknownPlaceholder { token: char, position: usize },

    #[error("Pattern ends with a lone '%'")]
    TrailingPercent,
}

/// Placeholder fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Artist,
    Album,
    Song,
    Year,
    Genre,
    Label,
    Isrc,
    ExplicitWord,
    ExplicitFlag,
    ArtistId,
    TrackId,
    AlbumId,
}

impl Field {
    fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'A' => Field::Artist,
            'L' => Field::Album,
            'S' => Field::Song,
            'Y' => Field::Year,
            'G' => Field::Genre,
            'B' => Field::Label,
            'I' => Field::Isrc,
            'E' => Field::ExplicitWord,
            'e' => Field::ExplicitFlag,
            'a' => Field::ArtistId,
            'T' => Field::TrackId,
            'U' => Field::AlbumId,
            _ => return None,
        })
    }

    /// Raw value for `meta`, `None` when missing or blank
    fn value(self, meta: &TrackMetadata) -> Option<String> {
        let text = match self {
            Field::Artist => meta.author.clone(),
            Field::Album => meta.album.clone(),
            Field::Song => meta.song.clone(),
            Field::Year => meta.release_year.clone(),
            Field::Genre => meta.genre_primary.clone(),
            Field::Label => meta.label.clone(),
            Field::Isrc => meta.isrc.clone(),
            Field::ExplicitWord => meta
                .explicit
                .map(|e| if e { "Explicit" } else { "Clean" }.to_string()),
            Field::ExplicitFlag => meta.explicit.map(|e| e.to_string()),
            Field::ArtistId => meta.artist_adamid.clone(),
            Field::TrackId => meta.applemusic_track_id.clone(),
            Field::AlbumId => meta.applemusic_album_id.clone(),
        };
        text.filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field(Field),
}

/// Validated pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Vec<Piece>>,
}

impl Pattern {
    /// Parse and validate `pattern`
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.trim().is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::new();
        let mut current: Vec<Piece> = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices();

        while let Some((position, ch)) = chars.next() {
            match ch {
                '%' => match chars.next() {
                    Some((_, '%')) => literal.push('%'),
                    Some((_, code)) => {
                        let field = Field::from_code(code).ok_or(PatternError::UnknownPlaceholder {
                            token: code,
                            position,
                        })?;
                        if !literal.is_empty() {
                            current.push(Piece::Literal(std::mem::take(&mut literal)));
                        }
                        current.push(Piece::Field(field));
                    }
                    None => return Err(PatternError::TrailingPercent),
                },
                '/' => {
                    if !literal.is_empty() {
                        current.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(std::mem::take(&mut current));
                }
                _ => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            current.push(Piece::Literal(literal));
        }
        segments.push(current);

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Relative destination path without extension, `/`-separated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderedPath(String);

impl RenderedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenderedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Expands a [`Pattern`] against recognized metadata
#[derive(Debug, Clone)]
pub struct PatternRenderer {
    pattern: Pattern,
    drop_unknowns: bool,
}

impl PatternRenderer {
    pub fn new(pattern: Pattern, drop_unknowns: bool) -> Self {
        Self {
            pattern,
            drop_unknowns,
        }
    }

    /// Render one record
    ///
    /// Missing values become `Unknown`, or remove their whole segment when
    /// unknowns are dropped. Never returns an empty path.
    pub fn render(&self, meta: &TrackMetadata) -> RenderedPath {
        let mut parts: Vec<String> = Vec::with_capacity(self.pattern.segments.len());

        'segments: for segment in &self.pattern.segments {
            let mut raw = String::new();
            for piece in segment {
                match piece {
                    Piece::Literal(text) => raw.push_str(text),
                    Piece::Field(field) => match field.value(meta) {
                        Some(value) => raw.push_str(&sanitize_component(&value)),
                        None if self.drop_unknowns => continue 'segments,
                        None => raw.push_str(UNKNOWN),
                    },
                }
            }
            if matches!(raw.trim(), "" | "." | "..") {
                continue;
            }
            parts.push(sanitize_component(&raw));
        }

        if parts.is_empty() {
            return RenderedPath(UNKNOWN.to_string());
        }
        RenderedPath(parts.join("/"))
    }
}

/// Make `value` safe as a single path component
///
/// NFKC-normalizes, replaces separators, reserved and control characters with
/// `-`, collapses whitespace and trims spaces and dots from both ends. Never
/// returns an empty string.
pub fn sanitize_component(value: &str) -> String {
    let replaced: String = value
        .nfkc()
        .map(|ch| match ch {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '-',
            c if (c as u32) < 32 => '-',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c| c == ' ' || c == '.');

    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queen(album: Option<&str>) -> TrackMetadata {
        TrackMetadata {
            author: Some("Queen".to_string()),
            album: album.map(str::to_string),
            song: Some("Bohemian Rhapsody".to_string()),
            ..Default::default()
        }
    }

    fn render(pattern: &str, drop_unknowns: bool, meta: &TrackMetadata) -> String {
        PatternRenderer::new(Pattern::parse(pattern).unwrap(), drop_unknowns)
            .render(meta)
            .to_string()
    }

    #[test]
    fn test_default_pattern() {
        assert_eq!(
            render(DEFAULT_PATTERN, false, &queen(Some("A Night at the Opera"))),
            "Queen/A Night at the Opera/Bohemian Rhapsody"
        );
    }

    #[test]
    fn test_missing_value_becomes_unknown() {
        assert_eq!(
            render(DEFAULT_PATTERN, false, &queen(None)),
            "Queen/Unknown/Bohemian Rhapsody"
        );
    }

    #[test]
    fn test_drop_unknowns_removes_segment() {
        assert_eq!(
            render(DEFAULT_PATTERN, true, &queen(None)),
            "Queen/Bohemian Rhapsody"
        );
        assert_eq!(
            render("%A/%Y - %L/%S", true, &queen(Some("Opera"))),
            "Queen/Bohemian Rhapsody"
        );
    }

    #[test]
    fn test_all_segments_dropped() {
        assert_eq!(render("%Y/%G", true, &queen(None)), "Unknown");
    }

    #[test]
    fn test_mixed_literals_and_explicit_forms() {
        let mut meta = queen(Some("Opera"));
        meta.explicit = Some(true);
        meta.release_year = Some("1975".to_string());
        meta.genre_primary = Some("Rock".to_string());
        assert_eq!(
            render("%G/%A - %S (%E) [%e]", false, &meta),
            "Rock/Queen - Bohemian Rhapsody (Explicit) [true]"
        );
        assert_eq!(render("%A/%Y - %L/%S", false, &meta), "Queen/1975 - Opera/Bohemian Rhapsody");

        meta.explicit = Some(false);
        assert_eq!(render("%E", false, &meta), "Clean");
    }

    #[test]
    fn test_values_cannot_add_segments() {
        let meta = TrackMetadata {
            author: Some("AC/DC".to_string()),
            song: Some("What? Now: \"Live\"".to_string()),
            ..Default::default()
        };
        assert_eq!(render("%A/%S", false, &meta), "AC-DC/What- Now- -Live-");
    }

    #[test]
    fn test_dot_segments_are_discarded() {
        assert_eq!(render("./../%A//%S", false, &queen(None)), "Queen/Bohemian Rhapsody");
    }

    #[test]
    fn test_literal_percent() {
        assert_eq!(render("%A/100%% %S", false, &queen(None)), "Queen/100% Bohemian Rhapsody");
    }

    #[test]
    fn test_unknown_placeholder_is_rejected() {
        assert_eq!(
            Pattern::parse("%A/%X/%S"),
            Err(PatternError::UnknownPlaceholder {
                token: 'X',
                position: 3
            })
        );
        assert_eq!(Pattern::parse("%A/%"), Err(PatternError::TrailingPercent));
        assert_eq!(Pattern::parse("  "), Err(PatternError::Empty));
    }

    #[test]
    fn test_render_is_idempotent() {
        let renderer = PatternRenderer::new(Pattern::parse("%A/%L/%S").unwrap(), false);
        let meta = queen(Some("A Night at the Opera"));
        assert_eq!(renderer.render(&meta), renderer.render(&meta));
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("  Hello   World  "), "Hello World");
        assert_eq!(sanitize_component("a/b\\c"), "a-b-c");
        assert_eq!(sanitize_component("tab\there"), "tab-here");
        assert_eq!(sanitize_component("...trailing dots..."), "trailing dots");
        assert_eq!(sanitize_component(" . "), "Unknown");
        assert_eq!(sanitize_component(""), "Unknown");
        // NFKC folds compatibility forms
        assert_eq!(sanitize_component("ﬁ"), "fi");
    }
}
