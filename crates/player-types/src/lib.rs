//! Data model shared by the session core, the audio engine and the client.
//!
//! `Track` is the in-process representation. The catalog service speaks a
//! slightly different shape (`CatalogSong`, `SongRef`, `PlaylistRecord`,
//! `ListeningStats`);
//! those records are converted at the edge and never travel further.

use serde::{Deserialize, Serialize};

/// Stable catalog identifier of a track.
pub type TrackId = String;

/// A single playable media item. Immutable once fetched from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Catalog identifier.
    pub id: TrackId,
    /// Display title.
    pub title: String,
    /// Artist name, when the catalog knows it.
    pub artist: Option<String>,
    /// Duration in seconds; `0.0` when unknown.
    pub duration_secs: f64,
    /// Playable URL, absolute or relative to the catalog base.
    pub url: String,
    /// Mood tags attached at upload time.
    #[serde(default)]
    pub moods: Vec<String>,
    /// Stored file name on the catalog side; its extension hints the stream format.
    pub original_filename: Option<String>,
}

impl Track {
    /// Title shown to the user. Falls back to the file stem of the original name.
    pub fn display_title(&self) -> &str {
        if !self.title.trim().is_empty() {
            return &self.title;
        }
        self.original_filename
            .as_deref()
            .and_then(|name| name.rsplit_once('.').map(|(stem, _)| stem).or(Some(name)))
            .unwrap_or("Untitled")
    }

    /// Artist shown to the user.
    pub fn display_artist(&self) -> &str {
        match self.artist.as_deref() {
            Some(a) if !a.trim().is_empty() => a,
            _ => "Unknown Artist",
        }
    }

    /// Whether the track carries `mood` (case-insensitive).
    pub fn has_mood(&self, mood: &str) -> bool {
        self.moods.iter().any(|m| m.eq_ignore_ascii_case(mood))
    }
}

/// Song record returned by `GET /api/songs`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogSong {
    #[serde(alias = "_id")]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    pub url: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl From<CatalogSong> for Track {
    fn from(song: CatalogSong) -> Self {
        let title = song
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(song.filename);
        Track {
            id: song.id,
            title,
            artist: song.artist,
            duration_secs: sanitize_secs(song.duration),
            url: song.url,
            moods: song.moods,
            original_filename: song.original_filename,
        }
    }
}

/// Song reference embedded in a playlist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SongRef {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    pub url: String,
}

impl From<SongRef> for Track {
    fn from(song: SongRef) -> Self {
        let title = song
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| song.filename.clone());
        Track {
            id: song.id,
            title,
            artist: song.artist,
            duration_secs: sanitize_secs(song.duration),
            url: song.url,
            moods: Vec::new(),
            // Playlist refs only carry the upload name; still good enough for a format hint.
            original_filename: Some(song.filename),
        }
    }
}

impl From<&Track> for SongRef {
    fn from(track: &Track) -> Self {
        SongRef {
            id: track.id.clone(),
            filename: track
                .original_filename
                .clone()
                .unwrap_or_else(|| track.title.clone()),
            title: Some(track.display_title().to_string()),
            artist: Some(track.display_artist().to_string()),
            duration: (track.duration_secs > 0.0).then_some(track.duration_secs),
            url: track.url.clone(),
        }
    }
}

/// Playlist returned by `GET /api/playlists[/{id}]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaylistRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub songs: Vec<SongRef>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl PlaylistRecord {
    /// Playlist songs as playable tracks, in playlist order.
    pub fn tracks(&self) -> Vec<Track> {
        self.songs.iter().cloned().map(Track::from).collect()
    }
}

/// Listening summary returned by `GET /api/analytics/stats`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ListeningStats {
    #[serde(default)]
    pub top_songs: Vec<TopSong>,
    /// Last seven days, oldest first.
    #[serde(default)]
    pub daily_activity: Vec<DailyPlays>,
    #[serde(default)]
    pub total_plays: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopSong {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub artist: Option<String>,
    pub plays: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyPlays {
    /// Short weekday name.
    pub name: String,
    pub plays: u64,
}

/// Reason why an engine session ended.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackEndReason {
    /// Natural end of stream.
    Eof,
    /// Transport, decode or output error interrupted playback.
    Error,
    /// Playback was torn down by a command.
    Stopped,
}

/// Format seconds as `m:ss`; non-finite or non-positive values render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn sanitize_secs(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
