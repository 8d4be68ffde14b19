//! Session state: what is playing, the track collections, and the user.

use player_types::{Track, TrackId};

/// Display name given to a profile that has never been renamed.
pub const DEFAULT_USER_NAME: &str = "Nexus User";

const USER_ID_PREFIX: &str = "NEXUS-";
// Readable characters only (no 0/O, 1/I).
const USER_ID_CHARSET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const USER_ID_LEN: usize = 5;

/// Authoritative "what is playing" snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub is_playing: bool,
    /// Output gain in `[0, 1]`.
    pub volume: f32,
    /// Seconds into the current track.
    pub position_secs: f64,
    /// Seconds; `0.0` while unknown.
    pub duration_secs: f64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_track: None,
            is_playing: false,
            volume: 1.0,
            position_secs: 0.0,
            duration_secs: 0.0,
        }
    }
}

impl PlaybackState {
    pub fn current_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }

    /// Clamp `position` to `[0, duration]`; only the lower bound applies while duration is unknown.
    pub fn clamp_position(&self, position: f64) -> f64 {
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        if self.duration_secs > 0.0 {
            position.min(self.duration_secs)
        } else {
            position
        }
    }
}

/// Clamp a requested volume into `[0, 1]`. NaN maps to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Insertion-ordered set of liked track ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LikedSet {
    ids: Vec<TrackId>,
}

impl LikedSet {
    /// Build from persisted ids, dropping duplicates but keeping first-seen order.
    pub fn from_ids<I: IntoIterator<Item = TrackId>>(ids: I) -> Self {
        let mut set = Self::default();
        for id in ids {
            if !set.contains(&id) {
                set.ids.push(id);
            }
        }
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|x| x == id)
    }

    /// Flip membership of `id`. Returns `true` when the id is now liked.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.remove(id) {
            false
        } else {
            self.ids.push(id.to_string());
            true
        }
    }

    /// Remove `id`; returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|x| x != id);
        self.ids.len() != before
    }

    pub fn ids(&self) -> &[TrackId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The library, the explicit queue and the liked set, mutated together.
#[derive(Clone, Debug, Default)]
pub struct Collections {
    pub library: Vec<Track>,
    pub queue: Vec<Track>,
    pub liked: LikedSet,
}

/// Where a removed track was found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Removal {
    pub library: usize,
    pub queue: usize,
    pub liked: bool,
}

impl Removal {
    pub fn any(&self) -> bool {
        self.library > 0 || self.queue > 0 || self.liked
    }
}

impl Collections {
    /// List used for next/previous: the queue when it has entries, the library otherwise.
    pub fn play_list(&self) -> &[Track] {
        if self.queue.is_empty() {
            &self.library
        } else {
            &self.queue
        }
    }

    /// Drop `id` from library, queue and liked set in one step.
    pub fn remove_track(&mut self, id: &str) -> Removal {
        let library_before = self.library.len();
        let queue_before = self.queue.len();
        self.library.retain(|t| t.id != id);
        self.queue.retain(|t| t.id != id);
        let liked = self.liked.remove(id);
        Removal {
            library: library_before - self.library.len(),
            queue: queue_before - self.queue.len(),
            liked,
        }
    }

    /// Look a track up by id, queue first.
    pub fn find(&self, id: &str) -> Option<&Track> {
        self.queue
            .iter()
            .chain(self.library.iter())
            .find(|t| t.id == id)
    }

    /// Library tracks carrying `mood`; every track when no mood is set.
    pub fn visible_library(&self, mood: Option<&str>) -> Vec<&Track> {
        match mood {
            Some(mood) => self.library.iter().filter(|t| t.has_mood(mood)).collect(),
            None => self.library.iter().collect(),
        }
    }

    /// Liked tracks that are still present in the library, in like order.
    pub fn liked_tracks(&self) -> Vec<&Track> {
        self.liked
            .ids()
            .iter()
            .filter_map(|id| self.library.iter().find(|t| &t.id == id))
            .collect()
    }
}

/// Who is listening. Persisted across restarts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub id: String,
}

impl UserProfile {
    /// Fresh profile with the default name and a random id.
    pub fn generate() -> Self {
        Self {
            name: DEFAULT_USER_NAME.to_string(),
            id: generate_user_id(),
        }
    }
}

/// Random `NEXUS-XXXXX` user id.
pub fn generate_user_id() -> String {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    let mut id = String::with_capacity(USER_ID_PREFIX.len() + USER_ID_LEN);
    id.push_str(USER_ID_PREFIX);
    for b in bytes.iter().take(USER_ID_LEN) {
        id.push(USER_ID_CHARSET[*b as usize % USER_ID_CHARSET.len()] as char);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: id.to_uppercase(),
            artist: None,
            duration_secs: 0.0,
            url: format!("/api/songs/{id}"),
            moods: Vec::new(),
            original_filename: None,
        }
    }

    #[test]
    fn clamp_volume_bounds() {
        assert_eq!(clamp_volume(1.5), 1.0);
        assert_eq!(clamp_volume(-0.2), 0.0);
        assert_eq!(clamp_volume(0.25), 0.25);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }

    #[test]
    fn clamp_position_respects_known_duration() {
        let mut state = PlaybackState::default();
        assert_eq!(state.clamp_position(42.0), 42.0);
        state.duration_secs = 30.0;
        assert_eq!(state.clamp_position(42.0), 30.0);
        assert_eq!(state.clamp_position(-1.0), 0.0);
    }

    #[test]
    fn liked_set_toggle_and_dedup() {
        let mut liked = LikedSet::from_ids(vec!["a".to_string(), "b".to_string(), "a".to_string()]);
        assert_eq!(liked.ids(), &["a".to_string(), "b".to_string()]);
        assert!(!liked.toggle("a"));
        assert!(!liked.contains("a"));
        assert!(liked.toggle("a"));
        assert_eq!(liked.ids().last().map(String::as_str), Some("a"));
    }

    #[test]
    fn play_list_falls_back_to_library_when_queue_is_empty() {
        let mut c = Collections {
            library: vec![track("a"), track("b")],
            ..Default::default()
        };
        assert_eq!(c.play_list().len(), 2);
        c.queue.push(track("b"));
        assert_eq!(c.play_list().len(), 1);
        assert_eq!(c.play_list()[0].id, "b");
    }

    #[test]
    fn remove_track_cascades_everywhere() {
        let mut c = Collections {
            library: vec![track("a"), track("b")],
            queue: vec![track("b"), track("a"), track("b")],
            liked: LikedSet::from_ids(vec!["b".to_string()]),
        };
        let removal = c.remove_track("b");
        assert_eq!(
            removal,
            Removal {
                library: 1,
                queue: 2,
                liked: true
            }
        );
        assert!(c.library.iter().all(|t| t.id != "b"));
        assert!(c.queue.iter().all(|t| t.id != "b"));
        assert!(!c.liked.contains("b"));
        assert!(!c.remove_track("zzz").any());
    }

    #[test]
    fn visible_library_filters_by_mood() {
        let mut happy = track("h");
        happy.moods = vec!["Happy".to_string()];
        let c = Collections {
            library: vec![happy, track("plain")],
            ..Default::default()
        };
        assert_eq!(c.visible_library(None).len(), 2);
        let filtered = c.visible_library(Some("happy"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "h");
    }

    #[test]
    fn generated_user_id_has_expected_shape() {
        let id = generate_user_id();
        assert!(id.starts_with("NEXUS-"));
        let suffix = &id["NEXUS-".len()..];
        assert_eq!(suffix.len(), 5);
        assert!(suffix.bytes().all(|b| USER_ID_CHARSET.contains(&b)));
        assert_eq!(UserProfile::generate().name, DEFAULT_USER_NAME);
    }
}
