//! Streaming audio engine: HTTP range source → Symphonia decode → Rubato
//! resample → CPAL output, wrapped in a [`player::Playback`] handle.

pub mod config;
pub mod decode;
pub mod device;
pub mod output;
pub mod player;
pub mod queue;
pub mod resample;
pub mod stream;

pub use config::{EngineConfig, HttpConfig, PlaybackConfig};
pub use player::{EventCallback, Playback, StreamEvent, StreamPlayer};
