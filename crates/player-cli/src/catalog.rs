//! Blocking HTTP client for the catalog service.

use std::time::Duration;

use anyhow::{Context, Result};
use player_types::{CatalogSong, ListeningStats, PlaylistRecord, SongRef, Track};
use serde::de::DeserializeOwned;
use ureq::Agent;

const USER_HEADER: &str = "X-User-ID";

/// Catalog endpoints scoped to one user.
///
/// Every request is bounded by the timeout given at construction; the shell
/// calls these from its control loop.
#[derive(Clone)]
pub struct CatalogClient {
    agent: Agent,
    server: String,
    user_id: String,
}

impl CatalogClient {
    pub fn new(server: &str, user_id: &str, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            server: server.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn songs(&self) -> Result<Vec<Track>> {
        let url = songs_url(&self.server);
        let songs: Vec<CatalogSong> = read_json(
            self.agent
                .get(&url)
                .header(USER_HEADER, self.user_id.as_str())
                .call()
                .context("request /api/songs")?,
            "api/songs",
        )?;
        Ok(songs.into_iter().map(Track::from).collect())
    }

    pub fn songs_by_mood(&self, mood: &str) -> Result<Vec<Track>> {
        let url = mood_url(&self.server, mood);
        let songs: Vec<CatalogSong> = read_json(
            self.agent
                .get(&url)
                .header(USER_HEADER, self.user_id.as_str())
                .call()
                .context("request /api/songs/moods")?,
            "api/songs/moods",
        )?;
        Ok(songs.into_iter().map(Track::from).collect())
    }

    pub fn delete_song(&self, id: &str) -> Result<()> {
        let url = song_url(&self.server, id);
        let resp = self
            .agent
            .delete(&url)
            .header(USER_HEADER, self.user_id.as_str())
            .call()
            .context("request DELETE /api/songs")?;
        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("delete song failed with {}", resp.status()));
        }
        Ok(())
    }

    pub fn playlists(&self) -> Result<Vec<PlaylistRecord>> {
        let url = playlists_url(&self.server);
        read_json(
            self.agent
                .get(&url)
                .header(USER_HEADER, self.user_id.as_str())
                .call()
                .context("request /api/playlists")?,
            "api/playlists",
        )
    }

    pub fn playlist(&self, id: &str) -> Result<PlaylistRecord> {
        let url = playlist_url(&self.server, id);
        read_json(
            self.agent
                .get(&url)
                .header(USER_HEADER, self.user_id.as_str())
                .call()
                .context("request /api/playlists/{id}")?,
            "api/playlists/{id}",
        )
    }

    /// Append `track` to a playlist; the catalog skips songs already on it.
    pub fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> Result<PlaylistRecord> {
        let url = playlist_songs_url(&self.server, playlist_id);
        read_json(
            self.agent
                .post(&url)
                .header(USER_HEADER, self.user_id.as_str())
                .send_json(SongRef::from(track))
                .context("request POST /api/playlists/{id}/songs")?,
            "api/playlists/{id}/songs",
        )
    }

    pub fn remove_from_playlist(&self, playlist_id: &str, song_id: &str) -> Result<PlaylistRecord> {
        let url = playlist_song_url(&self.server, playlist_id, song_id);
        read_json(
            self.agent
                .delete(&url)
                .header(USER_HEADER, self.user_id.as_str())
                .call()
                .context("request DELETE /api/playlists/{id}/songs")?,
            "api/playlists/{id}/songs/{song_id}",
        )
    }

    /// Play counts for this user.
    pub fn stats(&self) -> Result<ListeningStats> {
        let url = format!("{}/api/analytics/stats", self.server);
        read_json(
            self.agent
                .get(&url)
                .header(USER_HEADER, self.user_id.as_str())
                .call()
                .context("request /api/analytics/stats")?,
            "api/analytics/stats",
        )
    }
}

fn songs_url(server: &str) -> String {
    format!("{}/api/songs", server.trim_end_matches('/'))
}

fn song_url(server: &str, id: &str) -> String {
    format!("{}/{}", songs_url(server), urlencoding::encode(id))
}

fn mood_url(server: &str, mood: &str) -> String {
    format!("{}/moods/{}", songs_url(server), urlencoding::encode(mood.trim()))
}

fn playlists_url(server: &str) -> String {
    format!("{}/api/playlists", server.trim_end_matches('/'))
}

fn playlist_url(server: &str, id: &str) -> String {
    format!("{}/{}", playlists_url(server), urlencoding::encode(id))
}

fn playlist_songs_url(server: &str, id: &str) -> String {
    format!("{}/songs", playlist_url(server, id))
}

fn playlist_song_url(server: &str, id: &str, song_id: &str) -> String {
    format!("{}/{}", playlist_songs_url(server, id), urlencoding::encode(song_id))
}

pub(crate) fn read_json<T: DeserializeOwned>(
    mut resp: ureq::http::Response<ureq::Body>,
    label: &str,
) -> Result<T> {
    let body = resp
        .body_mut()
        .read_to_string()
        .with_context(|| format!("read /{label} response body"))?;
    serde_json::from_str(&body).with_context(|| format!("decode /{label} response"))
}
