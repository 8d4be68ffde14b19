//! [`AudioBackend`] over the streaming engine.

use std::sync::Arc;

use audio_player::{EngineConfig, EventCallback, Playback, StreamEvent, StreamPlayer};
use player_session::{AudioBackend, AudioHandle, EventSink, LoadRequest};
use player_types::PlaybackEndReason;

pub struct StreamBackend {
    player: StreamPlayer,
}

impl StreamBackend {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            player: StreamPlayer::new(config),
        }
    }
}

pub struct StreamHandle {
    playback: Playback,
}

impl AudioHandle for StreamHandle {
    fn play(&mut self) {
        self.playback.play();
    }

    fn pause(&mut self) {
        self.playback.pause();
    }

    fn set_volume(&mut self, volume: f32) {
        self.playback.set_volume(volume);
    }

    fn seek(&mut self, position_secs: f64) {
        if let Err(e) = self.playback.seek(position_secs) {
            tracing::warn!(position_secs, "seek failed: {e:#}");
        }
    }

    fn position_secs(&self) -> f64 {
        self.playback.position_secs()
    }

    fn stop(&mut self) {
        self.playback.stop();
    }
}

impl AudioBackend for StreamBackend {
    type Handle = StreamHandle;

    fn open(&mut self, request: LoadRequest, events: EventSink) -> anyhow::Result<StreamHandle> {
        let on_event: EventCallback = Arc::new(move |event| forward(&events, event));
        let playback = self.player.open(
            &request.url,
            request.format_hint.as_deref(),
            request.volume,
            on_event,
        )?;
        Ok(StreamHandle { playback })
    }
}

/// Translate an engine event into the session's vocabulary.
fn forward(sink: &EventSink, event: StreamEvent) {
    match event {
        StreamEvent::Ready { duration_secs } => sink.loaded(duration_secs),
        StreamEvent::Ended {
            reason: PlaybackEndReason::Eof,
            ..
        } => sink.ended(),
        StreamEvent::Ended {
            reason: PlaybackEndReason::Error,
            detail,
        } => sink.load_error(detail.unwrap_or_else(|| "playback failed".to_string())),
        StreamEvent::Ended {
            reason: PlaybackEndReason::Stopped,
            ..
        } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use player_session::engine::Desired;
    use player_session::{EngineAdapter, EngineEvent};
    use player_types::Track;

    #[test]
    fn unreachable_stream_surfaces_as_load_error() {
        let mut config = EngineConfig::default();
        config.http.timeout = Duration::from_millis(500);
        let mut adapter = EngineAdapter::new(
            StreamBackend::new(config),
            "http://127.0.0.1:9",
            Duration::from_millis(50),
        );
        let track = Track {
            id: "t1".to_string(),
            title: "Offline".to_string(),
            artist: None,
            duration_secs: 0.0,
            url: "/uploads/offline.mp3".to_string(),
            moods: Vec::new(),
            original_filename: Some("offline.mp3".to_string()),
        };
        adapter
            .reconcile(Desired {
                track: Some(&track),
                start: 1,
                playing: true,
                volume: 0.5,
            })
            .unwrap();

        let message = adapter
            .events()
            .recv_timeout(Duration::from_secs(5))
            .unwrap();
        assert!(adapter.is_current(message.generation));
        assert!(matches!(message.event, EngineEvent::LoadError { .. }));
        adapter.release();
    }
}
