//! Playback session core: one authoritative playback state, the track
//! collections around it, and an adapter that keeps a single audio engine
//! handle in sync with that state.

pub mod analytics;
pub mod controller;
pub mod engine;
pub mod error;
pub mod persist;
pub mod queue;
pub mod session;
pub mod state;
pub mod theme;

pub use analytics::{AnalyticsReporter, ChannelReporter, NoopReporter, PlayReport};
pub use controller::PlayerController;
pub use engine::{
    AudioBackend, AudioHandle, EngineAdapter, EngineEvent, EngineMessage, EventSink, Generation,
    LoadRequest,
};
pub use error::{PlaybackError, QueueMiss};
pub use persist::PersistedState;
pub use session::{Flow, Input, Intent, SessionDriver};
pub use state::{Collections, LikedSet, PlaybackState, UserProfile};
pub use theme::{Color, Theme, derive_theme};
