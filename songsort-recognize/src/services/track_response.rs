//! Shazam-shaped response extraction
//!
//! The recognizer program prints one JSON document per file. Only a handful of
//! fields are read; everything else is ignored.

use serde::Deserialize;
use serde_json::Value;

use songsort_common::models::TrackMetadata;

use super::recognizer::Recognition;

#[derive(Debug, Default, Deserialize)]
struct ResponseDocument {
    #[serde(default)]
    track: Option<Track>,
}

#[derive(Debug, Default, Deserialize)]
struct Track {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    isrc: Option<String>,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    genres: Option<Genres>,
    #[serde(default)]
    hub: Option<Hub>,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Default, Deserialize)]
struct Section {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    metadata: Vec<SectionItem>,
}

#[derive(Debug, Default, Deserialize)]
struct SectionItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Genres {
    #[serde(default)]
    primary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Hub {
    #[serde(default)]
    explicit: Option<bool>,
    #[serde(default)]
    actions: Vec<HubAction>,
    #[serde(default)]
    options: Vec<HubOption>,
}

#[derive(Debug, Default, Deserialize)]
struct HubOption {
    #[serde(default)]
    actions: Vec<HubAction>,
}

#[derive(Debug, Default, Deserialize)]
struct HubAction {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Artist {
    #[serde(default)]
    adamid: Option<Value>,
}

/// Parse recognizer stdout into a [`Recognition`]
///
/// Empty output is a no match. Output that is not a response object is an
/// error, reported by the caller as a parse failure.
pub fn parse_response(stdout: &[u8]) -> Result<Recognition, serde_json::Error> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Recognition::NoMatch(None));
    }
    let doc: ResponseDocument = serde_json::from_slice(stdout)?;
    Ok(extract(doc))
}

fn extract(doc: ResponseDocument) -> Recognition {
    let Some(track) = doc.track else {
        return Recognition::NoMatch(None);
    };

    let author = non_blank(track.subtitle.clone());
    let song = non_blank(track.title.clone());
    if author.is_none() || song.is_none() {
        return Recognition::NoMatch(None);
    }

    let actions: Vec<&HubAction> = track
        .hub
        .iter()
        .flat_map(|hub| {
            hub.actions
                .iter()
                .chain(hub.options.iter().flat_map(|o| o.actions.iter()))
        })
        .collect();

    let applemusic_track_id = actions
        .iter()
        .filter(|a| a.kind.as_deref() == Some("applemusicplay"))
        .find_map(|a| a.id.as_ref().and_then(value_to_string));
    let applemusic_album_id = actions
        .iter()
        .filter_map(|a| a.uri.as_deref())
        .find_map(album_id_from_uri);

    Recognition::Matched(TrackMetadata {
        author,
        album: song_section_field(&track, "Album"),
        song,
        release_year: song_section_field(&track, "Released"),
        genre_primary: track.genres.as_ref().and_then(|g| non_blank(g.primary.clone())),
        label: song_section_field(&track, "Label"),
        isrc: non_blank(track.isrc.clone()),
        explicit: track.hub.as_ref().and_then(|h| h.explicit),
        artist_adamid: track
            .artists
            .first()
            .and_then(|a| a.adamid.as_ref())
            .and_then(value_to_string),
        applemusic_track_id,
        applemusic_album_id,
    })
}

fn song_section_field(track: &Track, title: &str) -> Option<String> {
    track
        .sections
        .iter()
        .filter(|s| s.kind.as_deref() == Some("SONG"))
        .flat_map(|s| s.metadata.iter())
        .find(|m| m.title.as_deref() == Some(title))
        .and_then(|m| non_blank(m.text.clone()))
}

/// `.../album/<slug>/<id>?i=...` or `.../album/<id>`
fn album_id_from_uri(uri: &str) -> Option<String> {
    let (_, rest) = uri.split_once("album/")?;
    let path = rest.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(Some(s.clone())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"{
        "matches": [{"id": "1"}],
        "track": {
            "title": "Bohemian Rhapsody",
            "subtitle": "Queen",
            "isrc": "GBUM71029604",
            "genres": {"primary": "Rock"},
            "artists": [{"adamid": "3296287"}],
            "hub": {
                "explicit": false,
                "actions": [
                    {"name": "apple", "type": "applemusicplay", "id": "1440650711"},
                    {"name": "apple", "type": "uri", "uri": "https://audio.example/preview.m4a"}
                ],
                "options": [
                    {"actions": [{"type": "applemusicopen",
                                  "uri": "https://music.apple.com/us/album/a-night-at-the-opera/1440650428?i=1440650711"}]}
                ]
            },
            "sections": [
                {"type": "SONG", "metadata": [
                    {"title": "Album", "text": "A Night at the Opera"},
                    {"title": "Label", "text": "EMI"},
                    {"title": "Released", "text": "1975"}
                ]},
                {"type": "LYRICS", "text": ["..."]}
            ]
        }
    }"#;

    #[test]
    fn test_full_response() {
        let Recognition::Matched(meta) = parse_response(FULL_RESPONSE.as_bytes()).unwrap() else {
            panic!("expected match");
        };
        assert_eq!(meta.author.as_deref(), Some("Queen"));
        assert_eq!(meta.song.as_deref(), Some("Bohemian Rhapsody"));
        assert_eq!(meta.album.as_deref(), Some("A Night at the Opera"));
        assert_eq!(meta.label.as_deref(), Some("EMI"));
        assert_eq!(meta.release_year.as_deref(), Some("1975"));
        assert_eq!(meta.genre_primary.as_deref(), Some("Rock"));
        assert_eq!(meta.isrc.as_deref(), Some("GBUM71029604"));
        assert_eq!(meta.explicit, Some(false));
        assert_eq!(meta.artist_adamid.as_deref(), Some("3296287"));
        assert_eq!(meta.applemusic_track_id.as_deref(), Some("1440650711"));
        assert_eq!(meta.applemusic_album_id.as_deref(), Some("1440650428"));
    }

    #[test]
    fn test_no_track_is_no_match() {
        assert_eq!(
            parse_response(br#"{"matches": []}"#).unwrap(),
            Recognition::NoMatch(None)
        );
        assert_eq!(parse_response(b"  \n").unwrap(), Recognition::NoMatch(None));
    }

    #[test]
    fn test_missing_title_is_no_match() {
        let result = parse_response(br#"{"track": {"subtitle": "Queen"}}"#).unwrap();
        assert_eq!(result, Recognition::NoMatch(None));
    }

    #[test]
    fn test_minimal_match_has_no_album() {
        let result =
            parse_response(br#"{"track": {"subtitle": "Queen", "title": "Test"}}"#).unwrap();
        let Recognition::Matched(meta) = result else {
            panic!("expected match");
        };
        assert_eq!(meta.album, None);
        assert_eq!(meta.applemusic_album_id, None);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(parse_response(b"Traceback (most recent call last)").is_err());
        assert!(parse_response(b"[1, 2]").is_err());
    }

    #[test]
    fn test_album_id_from_uri() {
        assert_eq!(
            album_id_from_uri("https://music.apple.com/album/123").as_deref(),
            Some("123")
        );
        assert_eq!(
            album_id_from_uri("https://music.apple.com/us/album/x/456?i=1").as_deref(),
            Some("456")
        );
        assert_eq!(album_id_from_uri("https://music.apple.com/us/song/789"), None);
    }
}
