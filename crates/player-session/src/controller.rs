//! The playback session controller.
//!
//! Owns the authoritative [`PlaybackState`] and the track collections. Every
//! mutation ends with a reconcile against the [`EngineAdapter`], so the live
//! audio handle always follows the state and never the other way round.

use player_types::Track;

use crate::analytics::AnalyticsReporter;
use crate::engine::{AudioBackend, Desired, EngineAdapter, EngineEvent, EngineMessage};
use crate::error::{PlaybackError, QueueMiss};
use crate::persist::{PERSIST_VERSION, PersistedState};
use crate::queue::{self, Direction};
use crate::state::{Collections, LikedSet, PlaybackState, Removal, UserProfile, clamp_volume};
use crate::theme::{Theme, derive_theme};

pub struct PlayerController<B: AudioBackend> {
    playback: PlaybackState,
    collections: Collections,
    user: UserProfile,
    mood_filter: Option<String>,
    /// Bumped on every track start; a new value forces a fresh load.
    start_seq: u64,
    engine: EngineAdapter<B>,
    analytics: Box<dyn AnalyticsReporter>,
    last_error: Option<PlaybackError>,
}

impl<B: AudioBackend> PlayerController<B> {
    pub fn new(
        engine: EngineAdapter<B>,
        analytics: Box<dyn AnalyticsReporter>,
        persisted: PersistedState,
    ) -> Self {
        let playback = PlaybackState {
            volume: clamp_volume(persisted.volume),
            ..PlaybackState::default()
        };
        let collections = Collections {
            liked: LikedSet::from_ids(persisted.liked_songs.iter().cloned()),
            ..Collections::default()
        };
        Self {
            playback,
            collections,
            user: persisted.user(),
            mood_filter: None,
            start_seq: 0,
            engine,
            analytics,
            last_error: None,
        }
    }

    /// Replace the library with a fresh catalog listing.
    pub fn set_library(&mut self, tracks: Vec<Track>) {
        tracing::info!(count = tracks.len(), "library updated");
        self.collections.library = tracks;
    }

    /// Make `track` current and start it from the beginning, even if it is
    /// already current.
    pub fn set_current_track(&mut self, track: Track) {
        self.start_track(track);
    }

    /// Flip play/pause. Does nothing when there is no current track.
    pub fn toggle_play(&mut self) {
        if self.playback.current_track.is_none() {
            return;
        }
        self.playback.is_playing = !self.playback.is_playing;
        tracing::debug!(playing = self.playback.is_playing, "toggle play");
        self.sync_engine();
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.playback.volume = clamp_volume(volume);
        self.sync_engine();
    }

    /// Stop playback, rewind, and release the engine handle. The current track stays selected.
    pub fn stop(&mut self) {
        self.playback.is_playing = false;
        self.playback.position_secs = 0.0;
        self.engine.release();
        self.sync_engine();
    }

    pub fn play_next(&mut self) -> Result<(), QueueMiss> {
        self.step(Direction::Next)
    }

    pub fn play_previous(&mut self) -> Result<(), QueueMiss> {
        self.step(Direction::Previous)
    }

    /// Append to the explicit queue. Duplicates are allowed.
    pub fn enqueue(&mut self, track: Track) {
        tracing::debug!(track_id = %track.id, "enqueue");
        self.collections.queue.push(track);
    }

    pub fn clear_queue(&mut self) {
        self.collections.queue.clear();
    }

    /// Drop `id` from library, queue and liked set together.
    pub fn remove_track(&mut self, id: &str) -> Removal {
        let removal = self.collections.remove_track(id);
        tracing::info!(
            track_id = id,
            library = removal.library,
            queue = removal.queue,
            liked = removal.liked,
            "track removed"
        );
        removal
    }

    /// Flip liked membership; returns whether the track is now liked.
    pub fn toggle_like(&mut self, track: &Track) -> bool {
        self.collections.liked.toggle(&track.id)
    }

    /// Jump to `position_secs` within the current track.
    pub fn seek(&mut self, position_secs: f64) {
        // A stopped session restarts from 0 on the next load.
        if self.playback.current_track.is_none() || !self.engine.has_live_handle() {
            return;
        }
        let target = self.playback.clamp_position(position_secs);
        self.playback.position_secs = target;
        self.engine.seek(target);
    }

    /// Relative seek, e.g. `+10`/`-10` seconds.
    pub fn seek_by(&mut self, delta_secs: f64) {
        self.seek(self.playback.position_secs + delta_secs);
    }

    pub fn set_mood_filter(&mut self, mood: Option<String>) {
        self.mood_filter = mood.filter(|m| !m.trim().is_empty());
    }

    pub fn set_user_name(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() {
            self.user.name = name.to_string();
        }
    }

    /// Apply one engine event. Returns `false` when it came from a stale handle and was ignored.
    pub fn handle_engine_message(&mut self, message: EngineMessage) -> bool {
        if !self.engine.is_current(message.generation) {
            tracing::debug!(
                generation = message.generation.value(),
                event = ?message.event,
                "dropping stale engine event"
            );
            return false;
        }

        match message.event {
            EngineEvent::Loaded { duration_secs } => {
                if let Some(duration) = duration_secs.filter(|d| d.is_finite() && *d > 0.0) {
                    self.playback.duration_secs = duration;
                    self.playback.position_secs =
                        self.playback.clamp_position(self.playback.position_secs);
                }
            }
            EngineEvent::Ended => {
                tracing::info!(track_id = self.playback.current_id().unwrap_or(""), "track ended");
                if let Err(miss) = self.play_next() {
                    tracing::debug!(reason = %miss, "nothing to advance to; stopping");
                    self.stop();
                }
            }
            EngineEvent::LoadError { reason } => {
                let track_id = self.playback.current_id().unwrap_or("").to_string();
                tracing::warn!(track_id = %track_id, reason = %reason, "playback failed");
                self.last_error = Some(PlaybackError::Load { track_id, reason });
                self.playback.is_playing = false;
                self.engine.release();
                self.sync_engine();
            }
        }
        true
    }

    /// Refresh the position from the live handle. Only meaningful while playing.
    pub fn poll_position(&mut self) {
        if !self.playback.is_playing {
            return;
        }
        if let Some(position) = self.engine.position_secs() {
            self.playback.position_secs = self.playback.clamp_position(position);
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn library(&self) -> &[Track] {
        &self.collections.library
    }

    pub fn queue(&self) -> &[Track] {
        &self.collections.queue
    }

    pub fn liked(&self) -> &LikedSet {
        &self.collections.liked
    }

    pub fn is_liked(&self, id: &str) -> bool {
        self.collections.liked.contains(id)
    }

    /// Library view after the mood filter.
    pub fn visible_library(&self) -> Vec<&Track> {
        self.collections.visible_library(self.mood_filter.as_deref())
    }

    pub fn mood_filter(&self) -> Option<&str> {
        self.mood_filter.as_deref()
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Theme for the current track, or the default palette.
    pub fn theme(&self) -> Theme {
        self.playback
            .current_id()
            .map(derive_theme)
            .unwrap_or(Theme::DEFAULT)
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn engine(&self) -> &EngineAdapter<B> {
        &self.engine
    }

    /// Snapshot of the settings that survive a restart.
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            version: PERSIST_VERSION,
            liked_songs: self.collections.liked.ids().to_vec(),
            volume: self.playback.volume,
            user_name: self.user.name.clone(),
            user_id: self.user.id.clone(),
        }
    }

    fn step(&mut self, direction: Direction) -> Result<(), QueueMiss> {
        let current_id = self
            .playback
            .current_id()
            .ok_or(QueueMiss::NoCurrentTrack)?;
        let list = self.collections.play_list();
        let index = queue::resolve(list, current_id, direction, |t: &Track| t.id.as_str())?;
        let track = list[index].clone();
        self.start_track(track);
        Ok(())
    }

    fn start_track(&mut self, track: Track) {
        self.start_seq += 1;
        tracing::info!(track_id = %track.id, title = %track.title, "track start");
        self.analytics.report(&track.id, &self.user.id);

        self.playback.duration_secs = if track.duration_secs > 0.0 {
            track.duration_secs
        } else {
            0.0
        };
        self.playback.position_secs = 0.0;
        self.playback.current_track = Some(track);
        self.playback.is_playing = true;
        self.last_error = None;
        self.sync_engine();
    }

    fn sync_engine(&mut self) {
        let desired = Desired {
            track: self.playback.current_track.as_ref(),
            start: self.start_seq,
            playing: self.playback.is_playing,
            volume: self.playback.volume,
        };
        if let Err(err) = self.engine.reconcile(desired) {
            tracing::warn!(error = %err, "could not start playback");
            self.playback.is_playing = false;
            self.engine.release();
            self.last_error = Some(err);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::{AudioHandle, EventSink, LoadRequest};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    /// What happened to fake handles, in order.
    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Op {
        Open(String),
        Play(String),
        Pause(String),
        Volume(String, f32),
        Seek(String, f64),
        Stop(String),
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeBackend {
        pub log: Rc<RefCell<Vec<Op>>>,
        pub sinks: Rc<RefCell<Vec<EventSink>>>,
        pub requests: Rc<RefCell<Vec<LoadRequest>>>,
        pub fail_open: Rc<RefCell<bool>>,
    }

    pub(crate) struct FakeHandle {
        track_id: String,
        log: Rc<RefCell<Vec<Op>>>,
        position: f64,
    }

    impl AudioHandle for FakeHandle {
        fn play(&mut self) {
            self.log.borrow_mut().push(Op::Play(self.track_id.clone()));
        }
        fn pause(&mut self) {
            self.log.borrow_mut().push(Op::Pause(self.track_id.clone()));
        }
        fn set_volume(&mut self, volume: f32) {
            self.log
                .borrow_mut()
                .push(Op::Volume(self.track_id.clone(), volume));
        }
        fn seek(&mut self, position_secs: f64) {
            self.position = position_secs;
            self.log
                .borrow_mut()
                .push(Op::Seek(self.track_id.clone(), position_secs));
        }
        fn position_secs(&self) -> f64 {
            self.position
        }
        fn stop(&mut self) {
            self.log.borrow_mut().push(Op::Stop(self.track_id.clone()));
        }
    }

    impl AudioBackend for FakeBackend {
        type Handle = FakeHandle;

        fn open(&mut self, request: LoadRequest, events: EventSink) -> anyhow::Result<FakeHandle> {
            if *self.fail_open.borrow() {
                anyhow::bail!("connection refused");
            }
            self.log
                .borrow_mut()
                .push(Op::Open(request.track_id.clone()));
            self.sinks.borrow_mut().push(events);
            let handle = FakeHandle {
                track_id: request.track_id.clone(),
                log: self.log.clone(),
                position: 0.0,
            };
            self.requests.borrow_mut().push(request);
            Ok(handle)
        }
    }

    #[derive(Clone, Default)]
    pub(crate) struct RecordingReporter {
        pub reports: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl AnalyticsReporter for RecordingReporter {
        fn report(&self, track_id: &str, user_id: &str) {
            self.reports
                .borrow_mut()
                .push((track_id.to_string(), user_id.to_string()));
        }
    }

    pub(crate) fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: id.to_uppercase(),
            artist: None,
            duration_secs: 0.0,
            url: format!("/api/songs/{id}"),
            moods: Vec::new(),
            original_filename: Some(format!("{id}.mp3")),
        }
    }

    pub(crate) fn controller() -> (PlayerController<FakeBackend>, FakeBackend, RecordingReporter) {
        let backend = FakeBackend::default();
        let reporter = RecordingReporter::default();
        let engine = EngineAdapter::new(
            backend.clone(),
            "http://catalog:8000",
            Duration::from_millis(50),
        );
        let mut persisted = PersistedState::fresh();
        persisted.user_id = "NEXUS-TEST2".to_string();
        let c = PlayerController::new(engine, Box::new(reporter.clone()), persisted);
        (c, backend, reporter)
    }

    fn drain(c: &mut PlayerController<FakeBackend>) -> Vec<bool> {
        let messages: Vec<EngineMessage> = c.engine().events().try_iter().collect();
        messages
            .into_iter()
            .map(|m| c.handle_engine_message(m))
            .collect()
    }

    fn opens(backend: &FakeBackend) -> usize {
        backend
            .log
            .borrow()
            .iter()
            .filter(|op| matches!(op, Op::Open(_)))
            .count()
    }

    #[test]
    fn set_current_track_loads_and_plays() {
        let (mut c, backend, reporter) = controller();
        c.set_current_track(track("a"));

        assert!(c.state().is_playing);
        assert_eq!(c.state().current_id(), Some("a"));
        assert_eq!(c.state().position_secs, 0.0);
        let requests = backend.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://catalog:8000/api/songs/a");
        assert_eq!(requests[0].format_hint.as_deref(), Some("mp3"));
        assert_eq!(
            reporter.reports.borrow().as_slice(),
            &[("a".to_string(), "NEXUS-TEST2".to_string())]
        );
        assert!(c.engine().poller().is_active());
    }

    #[test]
    fn old_handle_is_stopped_before_new_one_opens() {
        let (mut c, backend, _) = controller();
        c.set_current_track(track("a"));
        c.set_current_track(track("b"));

        let log = backend.log.borrow();
        let stop_a = log.iter().position(|op| *op == Op::Stop("a".into())).unwrap();
        let open_b = log.iter().position(|op| *op == Op::Open("b".into())).unwrap();
        assert!(stop_a < open_b);
    }

    #[test]
    fn late_events_from_superseded_load_are_ignored() {
        let (mut c, backend, _) = controller();
        c.set_current_track(track("a"));
        c.set_current_track(track("b"));

        let first = backend.sinks.borrow()[0].clone();
        first.loaded(Some(999.0));
        first.ended();
        assert_eq!(drain(&mut c), vec![false, false]);

        assert_eq!(c.state().current_id(), Some("b"));
        assert_eq!(c.state().duration_secs, 0.0);
        assert!(c.state().is_playing);
        assert_eq!(opens(&backend), 2);
    }

    #[test]
    fn replaying_the_current_track_reloads_it() {
        let (mut c, backend, reporter) = controller();
        c.set_current_track(track("a"));
        c.set_current_track(track("a"));
        assert_eq!(opens(&backend), 2);
        assert_eq!(reporter.reports.borrow().len(), 2);
    }

    #[test]
    fn loaded_event_sets_duration() {
        let (mut c, backend, _) = controller();
        c.set_current_track(track("a"));
        backend.sinks.borrow()[0].loaded(Some(184.5));
        assert_eq!(drain(&mut c), vec![true]);
        assert_eq!(c.state().duration_secs, 184.5);

        backend.sinks.borrow()[0].loaded(None);
        drain(&mut c);
        assert_eq!(c.state().duration_secs, 184.5);
    }

    #[test]
    fn toggle_play_without_track_is_a_no_op() {
        let (mut c, backend, _) = controller();
        c.toggle_play();
        assert!(!c.state().is_playing);
        assert!(backend.log.borrow().is_empty());
    }

    #[test]
    fn toggle_play_pauses_and_resumes_without_reporting() {
        let (mut c, backend, reporter) = controller();
        c.set_current_track(track("a"));
        c.toggle_play();
        assert!(!c.state().is_playing);
        assert!(!c.engine().poller().is_active());
        c.toggle_play();
        assert!(c.state().is_playing);
        assert!(c.engine().poller().is_active());

        let log = backend.log.borrow();
        assert!(log.contains(&Op::Pause("a".into())));
        assert_eq!(opens(&backend), 1);
        assert_eq!(reporter.reports.borrow().len(), 1);
    }

    #[test]
    fn volume_is_clamped_and_pushed_to_handle() {
        let (mut c, backend, _) = controller();
        c.set_current_track(track("a"));
        c.set_volume(1.7);
        assert_eq!(c.state().volume, 1.0);
        c.set_volume(-3.0);
        assert_eq!(c.state().volume, 0.0);
        c.set_volume(f32::NAN);
        assert_eq!(c.state().volume, 0.0);
        c.set_volume(0.3);
        assert!(backend.log.borrow().contains(&Op::Volume("a".into(), 0.3)));
    }

    #[test]
    fn next_and_previous_wrap_over_library() {
        let (mut c, _, _) = controller();
        c.set_library(vec![track("a"), track("b"), track("c")]);
        c.set_current_track(track("c"));
        c.play_next().unwrap();
        assert_eq!(c.state().current_id(), Some("a"));
        c.play_previous().unwrap();
        assert_eq!(c.state().current_id(), Some("c"));
    }

    #[test]
    fn queue_takes_precedence_over_library() {
        let (mut c, _, _) = controller();
        c.set_library(vec![track("a"), track("b"), track("c")]);
        c.enqueue(track("c"));
        c.enqueue(track("a"));
        c.set_current_track(track("c"));
        c.play_next().unwrap();
        assert_eq!(c.state().current_id(), Some("a"));
        c.play_next().unwrap();
        assert_eq!(c.state().current_id(), Some("c"));
    }

    #[test]
    fn next_with_unknown_or_missing_current_does_nothing() {
        let (mut c, backend, reporter) = controller();
        c.set_library(vec![track("a"), track("b")]);
        assert_eq!(c.play_next(), Err(QueueMiss::NoCurrentTrack));

        c.set_current_track(track("x"));
        assert_eq!(c.play_next(), Err(QueueMiss::NotFound));
        assert_eq!(c.play_previous(), Err(QueueMiss::NotFound));
        assert_eq!(c.state().current_id(), Some("x"));
        assert_eq!(opens(&backend), 1);
        assert_eq!(reporter.reports.borrow().len(), 1);
    }

    #[test]
    fn single_entry_queue_restarts_same_track() {
        let (mut c, backend, reporter) = controller();
        c.enqueue(track("solo"));
        c.set_current_track(track("solo"));
        c.play_next().unwrap();
        assert_eq!(c.state().current_id(), Some("solo"));
        assert_eq!(opens(&backend), 2);
        assert_eq!(reporter.reports.borrow().len(), 2);
    }

    #[test]
    fn ended_advances_to_next_track() {
        let (mut c, backend, reporter) = controller();
        c.set_library(vec![track("a"), track("b")]);
        c.set_current_track(track("a"));
        backend.sinks.borrow()[0].ended();
        assert_eq!(drain(&mut c), vec![true]);
        assert_eq!(c.state().current_id(), Some("b"));
        assert!(c.state().is_playing);
        assert_eq!(reporter.reports.borrow().len(), 2);
    }

    #[test]
    fn ended_with_empty_library_stops() {
        let (mut c, backend, _) = controller();
        c.set_current_track(track("a"));
        backend.sinks.borrow()[0].ended();
        drain(&mut c);
        assert!(!c.state().is_playing);
        assert_eq!(c.state().position_secs, 0.0);
        assert!(!c.engine().has_live_handle());
        assert!(backend.log.borrow().contains(&Op::Stop("a".into())));
    }

    #[test]
    fn load_error_stops_without_retry() {
        let (mut c, backend, _) = controller();
        c.set_library(vec![track("a"), track("b")]);
        c.set_current_track(track("a"));
        backend.sinks.borrow()[0].load_error("404 not found");
        drain(&mut c);

        assert!(!c.state().is_playing);
        assert_eq!(c.state().current_id(), Some("a"));
        assert!(!c.engine().has_live_handle());
        assert!(matches!(c.last_error(), Some(PlaybackError::Load { .. })));
        assert_eq!(opens(&backend), 1);
    }

    #[test]
    fn failed_open_leaves_session_stopped() {
        let (mut c, backend, _) = controller();
        *backend.fail_open.borrow_mut() = true;
        c.set_current_track(track("a"));
        assert!(!c.state().is_playing);
        assert!(!c.engine().has_live_handle());
        assert!(!c.engine().poller().is_active());
        assert!(matches!(c.last_error(), Some(PlaybackError::Load { .. })));
    }

    #[test]
    fn empty_url_is_invalid() {
        let (mut c, backend, _) = controller();
        let mut t = track("a");
        t.url = String::new();
        c.set_current_track(t);
        assert!(!c.state().is_playing);
        assert_eq!(
            c.last_error(),
            Some(&PlaybackError::InvalidUrl {
                track_id: "a".to_string()
            })
        );
        assert_eq!(opens(&backend), 0);
    }

    #[test]
    fn stop_rewinds_and_releases() {
        let (mut c, backend, _) = controller();
        c.set_current_track(track("a"));
        c.seek(30.0);
        c.stop();
        assert!(!c.state().is_playing);
        assert_eq!(c.state().position_secs, 0.0);
        assert_eq!(c.state().current_id(), Some("a"));
        assert!(!c.engine().has_live_handle());
        assert!(backend.log.borrow().contains(&Op::Stop("a".into())));

        c.toggle_play();
        assert!(c.state().is_playing);
        assert_eq!(opens(&backend), 2);
    }

    #[test]
    fn seek_after_stop_keeps_position_at_start() {
        let (mut c, backend, _) = controller();
        c.set_current_track(track("a"));
        c.stop();
        c.seek(30.0);
        c.seek_by(10.0);
        assert_eq!(c.state().position_secs, 0.0);
        assert!(!backend.log.borrow().iter().any(|op| matches!(op, Op::Seek(..))));

        c.toggle_play();
        assert_eq!(c.state().position_secs, 0.0);
        assert_eq!(backend.requests.borrow().last().map(|r| r.track_id.as_str()), Some("a"));
    }

    #[test]
    fn remove_track_cascades_and_keeps_current() {
        let (mut c, _, _) = controller();
        c.set_library(vec![track("a"), track("b")]);
        c.enqueue(track("b"));
        c.toggle_like(&track("b"));
        c.set_current_track(track("b"));

        let removal = c.remove_track("b");
        assert!(removal.liked);
        assert_eq!(removal.library, 1);
        assert_eq!(removal.queue, 1);
        assert!(c.queue().is_empty());
        assert!(!c.is_liked("b"));
        assert!(c.library().iter().all(|t| t.id != "b"));
        assert_eq!(c.state().current_id(), Some("b"));
    }

    #[test]
    fn seek_is_clamped_and_forwarded() {
        let (mut c, backend, _) = controller();
        c.seek(5.0);
        assert_eq!(c.state().position_secs, 0.0);

        c.set_current_track(track("a"));
        backend.sinks.borrow()[0].loaded(Some(60.0));
        drain(&mut c);
        c.seek_by(10.0);
        assert_eq!(c.state().position_secs, 10.0);
        c.seek_by(-30.0);
        assert_eq!(c.state().position_secs, 0.0);
        c.seek(90.0);
        assert_eq!(c.state().position_secs, 60.0);
        assert!(backend.log.borrow().contains(&Op::Seek("a".into(), 60.0)));
    }

    #[test]
    fn poll_position_reads_live_handle_while_playing() {
        let (mut c, _, _) = controller();
        c.set_current_track(track("a"));
        c.seek(12.0);
        c.poll_position();
        assert_eq!(c.state().position_secs, 12.0);
    }

    #[test]
    fn theme_follows_current_track() {
        let (mut c, _, _) = controller();
        assert_eq!(c.theme(), Theme::DEFAULT);
        c.set_current_track(track("a"));
        assert_eq!(c.theme(), derive_theme("a"));
    }

    #[test]
    fn persisted_snapshot_tracks_settings() {
        let (mut c, _, _) = controller();
        c.toggle_like(&track("a"));
        c.set_volume(0.5);
        c.set_user_name("  Robin ");
        let snapshot = c.persisted();
        assert_eq!(snapshot.liked_songs, vec!["a".to_string()]);
        assert_eq!(snapshot.volume, 0.5);
        assert_eq!(snapshot.user_name, "Robin");
        assert_eq!(snapshot.user_id, "NEXUS-TEST2");
    }

    #[test]
    fn mood_filter_limits_visible_library() {
        let (mut c, _, _) = controller();
        let mut calm = track("calm");
        calm.moods = vec!["Calm".to_string()];
        c.set_library(vec![calm, track("loud")]);
        c.set_mood_filter(Some("calm".to_string()));
        assert_eq!(c.visible_library().len(), 1);
        c.set_mood_filter(Some("  ".to_string()));
        assert_eq!(c.visible_library().len(), 2);
    }
}
