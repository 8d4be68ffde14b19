//! Audio engine adapter.
//!
//! Keeps exactly one live [`AudioHandle`] in line with the session's
//! `(track start, playing, volume)`. Every load gets a fresh [`Generation`];
//! events travel back over a channel tagged with the generation of the
//! handle that produced them, so anything from a torn-down handle can be
//! recognised and dropped.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use player_types::Track;

use crate::error::PlaybackError;

/// Monotonically increasing load token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.saturating_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Events a handle reports about its own load/playback.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// Media probed; duration in seconds when the container knows it.
    Loaded { duration_secs: Option<f64> },
    /// Reached the end of the media.
    Ended,
    /// Fetch or decode failed after the handle was created.
    LoadError { reason: String },
}

/// An [`EngineEvent`] stamped with the generation of its handle.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineMessage {
    pub generation: Generation,
    pub event: EngineEvent,
}

/// Sending side handed to a backend for one load.
#[derive(Clone, Debug)]
pub struct EventSink {
    generation: Generation,
    tx: Sender<EngineMessage>,
}

impl EventSink {
    fn new(generation: Generation, tx: Sender<EngineMessage>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn loaded(&self, duration_secs: Option<f64>) {
        self.send(EngineEvent::Loaded { duration_secs });
    }

    pub fn ended(&self) {
        self.send(EngineEvent::Ended);
    }

    pub fn load_error(&self, reason: impl Into<String>) {
        self.send(EngineEvent::LoadError {
            reason: reason.into(),
        });
    }

    fn send(&self, event: EngineEvent) {
        // The receiver lives as long as the adapter; a closed channel means the session is gone.
        let _ = self.tx.send(EngineMessage {
            generation: self.generation,
            event,
        });
    }
}

/// Everything a backend needs to open one stream.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadRequest {
    pub generation: Generation,
    pub track_id: String,
    /// Absolute media URL.
    pub url: String,
    /// Lowercase container extension, e.g. `mp3`.
    pub format_hint: Option<String>,
    pub volume: f32,
}

/// A live decode/stream resource bound to one track.
pub trait AudioHandle {
    fn play(&mut self);
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn seek(&mut self, position_secs: f64);
    fn position_secs(&self) -> f64;
    /// Stop output and release everything the handle holds. Must not return
    /// before the handle's workers have been told to stop.
    fn stop(&mut self);
}

/// Factory for [`AudioHandle`]s.
pub trait AudioBackend {
    type Handle: AudioHandle;

    /// Open a streaming handle for `request`. The handle reports through `events`.
    fn open(&mut self, request: LoadRequest, events: EventSink) -> anyhow::Result<Self::Handle>;
}

/// Periodic position poll that only exists while something is playing.
pub struct PositionPoller {
    interval: Duration,
    ticker: Option<Receiver<Instant>>,
}

impl PositionPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(10)),
            ticker: None,
        }
    }

    pub fn start(&mut self) {
        if self.ticker.is_none() {
            self.ticker = Some(crossbeam_channel::tick(self.interval));
        }
    }

    pub fn cancel(&mut self) {
        self.ticker = None;
    }

    pub fn is_active(&self) -> bool {
        self.ticker.is_some()
    }

    /// Tick receiver to select on; never fires while the poller is cancelled.
    pub fn receiver(&self) -> Receiver<Instant> {
        match &self.ticker {
            Some(rx) => rx.clone(),
            None => crossbeam_channel::never(),
        }
    }
}

/// What the session wants the engine to be doing.
#[derive(Clone, Copy, Debug)]
pub struct Desired<'a> {
    pub track: Option<&'a Track>,
    /// Track-start sequence; a new value means "load again" even for the same track.
    pub start: u64,
    pub playing: bool,
    pub volume: f32,
}

struct LiveHandle<H> {
    handle: H,
    generation: Generation,
    start: u64,
    playing: bool,
    volume: f32,
}

/// Owns the single live handle and reconciles it against [`Desired`] state.
pub struct EngineAdapter<B: AudioBackend> {
    backend: B,
    base_url: String,
    live: Option<LiveHandle<B::Handle>>,
    generation: Generation,
    events_tx: Sender<EngineMessage>,
    events_rx: Receiver<EngineMessage>,
    poller: PositionPoller,
}

impl<B: AudioBackend> EngineAdapter<B> {
    /// `base_url` resolves relative track URLs; `poll_interval` sets the position cadence.
    pub fn new(backend: B, base_url: impl Into<String>, poll_interval: Duration) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            backend,
            base_url: base_url.into(),
            live: None,
            generation: Generation::default(),
            events_tx,
            events_rx,
            poller: PositionPoller::new(poll_interval),
        }
    }

    /// Bring the live handle in line with `desired`.
    ///
    /// A changed track start tears the old handle down before anything new is
    /// opened. Loads only happen while `desired.playing` is set.
    pub fn reconcile(&mut self, desired: Desired<'_>) -> Result<(), PlaybackError> {
        let outdated = match (&self.live, desired.track) {
            (Some(live), Some(_)) => live.start != desired.start,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if outdated {
            self.release();
        }

        if self.live.is_none() {
            if let Some(track) = desired.track.filter(|_| desired.playing) {
                self.load(track, desired.start, desired.volume)?;
            }
        }

        if let Some(live) = self.live.as_mut() {
            if live.volume != desired.volume {
                live.handle.set_volume(desired.volume);
                live.volume = desired.volume;
            }
            if live.playing != desired.playing {
                if desired.playing {
                    live.handle.play();
                } else {
                    live.handle.pause();
                }
                live.playing = desired.playing;
            }
        }

        self.sync_poller();
        Ok(())
    }

    /// Stop and drop the live handle, if any. Its later events become stale.
    pub fn release(&mut self) {
        if let Some(mut live) = self.live.take() {
            tracing::debug!(generation = live.generation.value(), "releasing audio handle");
            live.handle.stop();
        }
        self.poller.cancel();
    }

    pub fn seek(&mut self, position_secs: f64) {
        if let Some(live) = self.live.as_mut() {
            live.handle.seek(position_secs);
        }
    }

    /// Current position reported by the live handle.
    pub fn position_secs(&self) -> Option<f64> {
        self.live.as_ref().map(|live| live.handle.position_secs())
    }

    /// Whether `generation` belongs to the handle that is live right now.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.live
            .as_ref()
            .is_some_and(|live| live.generation == generation)
    }

    pub fn has_live_handle(&self) -> bool {
        self.live.is_some()
    }

    /// Most recently issued generation (live or not).
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn events(&self) -> &Receiver<EngineMessage> {
        &self.events_rx
    }

    pub fn poller(&self) -> &PositionPoller {
        &self.poller
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn load(&mut self, track: &Track, start: u64, volume: f32) -> Result<(), PlaybackError> {
        self.generation = self.generation.next();
        let generation = self.generation;

        let Some(url) = resolve_media_url(&track.url, &self.base_url) else {
            tracing::warn!(track_id = %track.id, url = %track.url, "no resolvable media url");
            return Err(PlaybackError::InvalidUrl {
                track_id: track.id.clone(),
            });
        };

        let request = LoadRequest {
            generation,
            track_id: track.id.clone(),
            url,
            format_hint: format_hint(track),
            volume,
        };
        tracing::info!(
            track_id = %request.track_id,
            url = %request.url,
            format_hint = request.format_hint.as_deref().unwrap_or(""),
            generation = generation.value(),
            "track load started"
        );

        let events = EventSink::new(generation, self.events_tx.clone());
        let mut handle = self
            .backend
            .open(request, events)
            .map_err(|e| PlaybackError::Load {
                track_id: track.id.clone(),
                reason: format!("{e:#}"),
            })?;
        handle.set_volume(volume);
        handle.play();

        self.live = Some(LiveHandle {
            handle,
            generation,
            start,
            playing: true,
            volume,
        });
        Ok(())
    }

    fn sync_poller(&mut self) {
        let playing = self.live.as_ref().is_some_and(|live| live.playing);
        if playing {
            self.poller.start();
        } else {
            self.poller.cancel();
        }
    }
}

impl<B: AudioBackend> Drop for EngineAdapter<B> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Resolve a track URL against the catalog base. Absolute URLs pass through.
pub fn resolve_media_url(url: &str, base_url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    Some(format!("{base}/{}", url.trim_start_matches('/')))
}

/// Container hint: the original file's extension, else the URL's.
pub fn format_hint(track: &Track) -> Option<String> {
    track
        .original_filename
        .as_deref()
        .and_then(extension_of)
        .or_else(|| {
            let path = track.url.split(['?', '#']).next().unwrap_or(&track.url);
            let file = path.rsplit('/').next().unwrap_or(path);
            extension_of(file)
        })
}

fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(url: &str, original: Option<&str>) -> Track {
        Track {
            id: "t".to_string(),
            title: "T".to_string(),
            artist: None,
            duration_secs: 0.0,
            url: url.to_string(),
            moods: Vec::new(),
            original_filename: original.map(str::to_string),
        }
    }

    #[test]
    fn resolve_media_url_joins_relative_paths() {
        assert_eq!(
            resolve_media_url("/api/songs/1", "http://host:8000/"),
            Some("http://host:8000/api/songs/1".to_string())
        );
        assert_eq!(
            resolve_media_url("api/songs/1", "http://host:8000"),
            Some("http://host:8000/api/songs/1".to_string())
        );
    }

    #[test]
    fn resolve_media_url_keeps_absolute_urls() {
        assert_eq!(
            resolve_media_url("https://cdn/x.mp3", "http://host"),
            Some("https://cdn/x.mp3".to_string())
        );
    }

    #[test]
    fn resolve_media_url_rejects_blank_or_baseless() {
        assert_eq!(resolve_media_url("   ", "http://host"), None);
        assert_eq!(resolve_media_url("/api/songs/1", ""), None);
    }

    #[test]
    fn format_hint_prefers_original_filename() {
        let t = track("/api/songs/1", Some("abc.M4A"));
        assert_eq!(format_hint(&t), Some("m4a".to_string()));
    }

    #[test]
    fn format_hint_falls_back_to_url_extension() {
        let t = track("http://host/media/song.flac?token=1", None);
        assert_eq!(format_hint(&t), Some("flac".to_string()));
        let t = track("/api/songs/1", None);
        assert_eq!(format_hint(&t), None);
        let t = track("/api/songs/1", Some(".hidden"));
        assert_eq!(format_hint(&t), None);
    }

    #[test]
    fn generations_increase() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().next().value(), 2);
    }

    #[test]
    fn poller_receiver_is_silent_when_cancelled() {
        let mut poller = PositionPoller::new(Duration::from_millis(10));
        assert!(!poller.is_active());
        assert!(poller.receiver().recv_timeout(Duration::from_millis(30)).is_err());
        poller.start();
        assert!(poller.is_active());
        assert!(poller.receiver().recv_timeout(Duration::from_millis(500)).is_ok());
        poller.cancel();
        assert!(!poller.is_active());
    }
}
