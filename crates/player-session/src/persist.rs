//! On-disk form of the settings that survive a restart.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use player_types::TrackId;
use serde::{Deserialize, Serialize};

use crate::state::{UserProfile, clamp_volume};

pub const PERSIST_VERSION: u32 = 1;

/// Liked ids, volume and the user profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub version: u32,
    #[serde(default)]
    pub liked_songs: Vec<TrackId>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    pub user_name: String,
    pub user_id: String,
}

#[derive(Deserialize)]
struct VersionTag {
    version: Option<u32>,
}

fn default_volume() -> f32 {
    1.0
}

impl PersistedState {
    /// Defaults for a first run: nothing liked, full volume, a new user.
    pub fn fresh() -> Self {
        let user = UserProfile::generate();
        Self {
            version: PERSIST_VERSION,
            liked_songs: Vec::new(),
            volume: 1.0,
            user_name: user.name,
            user_id: user.id,
        }
    }

    pub fn user(&self) -> UserProfile {
        UserProfile {
            name: self.user_name.clone(),
            id: self.user_id.clone(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let tag: VersionTag = serde_json::from_str(text).context("parse persisted state")?;
        match tag.version {
            Some(PERSIST_VERSION) => {}
            Some(other) => anyhow::bail!("unsupported persisted state version {other}"),
            None => anyhow::bail!("persisted state has no version"),
        }
        let mut state: PersistedState =
            serde_json::from_str(text).context("parse persisted state")?;
        state.volume = clamp_volume(state.volume);
        if state.user_id.trim().is_empty() {
            state.user_id = crate::state::generate_user_id();
        }
        Ok(state)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize persisted state")
    }

    /// Load from `path`; a missing file yields [`PersistedState::fresh`].
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text)
                .with_context(|| format!("load state {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no saved state; starting fresh");
                Ok(Self::fresh())
            }
            Err(e) => Err(e).with_context(|| format!("read state {}", path.display())),
        }
    }

    /// Write atomically to `path` (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create state dir {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, self.to_json()?)
            .with_context(|| format!("write state {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("replace state {}", path.display()))?;
        Ok(())
    }
}
