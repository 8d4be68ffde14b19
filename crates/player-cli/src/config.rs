//! Client configuration loaded from TOML.
//!
//! Every field is optional; command-line flags win over file values and
//! built-in defaults fill whatever is left.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use audio_player::{EngineConfig, HttpConfig, PlaybackConfig};
use serde::Deserialize;

const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_CATALOG_TIMEOUT_MS: u64 = 5_000;
const STATE_FILE_NAME: &str = "player-state.json";

/// Top-level client configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Catalog base URL, e.g. `http://127.0.0.1:8000`.
    pub server: Option<String>,
    /// Position refresh cadence while playing.
    pub poll_interval_ms: Option<u64>,
    /// Where liked songs, volume and the user profile are kept.
    pub state_path: Option<PathBuf>,
    /// Output device name substring.
    pub device: Option<String>,
    pub playback: PlaybackSection,
    pub http: HttpSection,
}

/// `[playback]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlaybackSection {
    pub chunk_frames: Option<usize>,
    pub refill_max_frames: Option<usize>,
    pub buffer_seconds: Option<f32>,
}

/// `[http]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub block_size: Option<usize>,
    pub timeout_ms: Option<u64>,
    /// Bound on each catalog API request.
    pub catalog_timeout_ms: Option<u64>,
}

impl ClientConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("parse config {:?}", path))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<ClientConfig>(raw)?)
    }

    /// `config.toml` next to the executable, when it exists.
    pub fn auto_path() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(|dir| dir.join("config.toml")))
            .filter(|path| path.exists())
    }

    /// Catalog base URL without a trailing slash.
    pub fn server(&self, flag: Option<&str>) -> Result<String> {
        flag.or(self.server.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .ok_or_else(|| anyhow::anyhow!("catalog server is required; use --server or set `server` in the config"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_millis(
            self.http
                .catalog_timeout_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_CATALOG_TIMEOUT_MS),
        )
    }

    pub fn state_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.state_path.clone())
            .unwrap_or_else(default_state_path)
    }

    /// Engine settings with `device` taking precedence over the file value.
    pub fn engine(&self, device: Option<&str>) -> EngineConfig {
        let playback_defaults = PlaybackConfig::default();
        let http_defaults = HttpConfig::default();
        EngineConfig {
            playback: PlaybackConfig {
                chunk_frames: self
                    .playback
                    .chunk_frames
                    .filter(|n| *n > 0)
                    .unwrap_or(playback_defaults.chunk_frames),
                refill_max_frames: self
                    .playback
                    .refill_max_frames
                    .filter(|n| *n > 0)
                    .unwrap_or(playback_defaults.refill_max_frames),
                buffer_seconds: self
                    .playback
                    .buffer_seconds
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .unwrap_or(playback_defaults.buffer_seconds),
            },
            http: HttpConfig {
                block_size: self
                    .http
                    .block_size
                    .filter(|n| *n > 0)
                    .unwrap_or(http_defaults.block_size),
                timeout: self
                    .http
                    .timeout_ms
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis)
                    .unwrap_or(http_defaults.timeout),
            },
            device: device
                .map(str::to_string)
                .or_else(|| self.device.clone())
                .filter(|d| !d.trim().is_empty()),
        }
    }
}

fn default_state_path() -> PathBuf {
    std::env::current_dir()
        .map(|dir| dir.join(STATE_FILE_NAME))
        .unwrap_or_else(|_| PathBuf::from(STATE_FILE_NAME))
}
