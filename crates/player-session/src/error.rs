//! Error taxonomy for the playback session.
//!
//! None of these are fatal: each one leaves the session stopped but consistent.

use thiserror::Error;

/// Failures raised while bringing the audio engine in line with session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// The track has no URL that resolves to a playable location.
    #[error("track {track_id} has no resolvable media url")]
    InvalidUrl { track_id: String },
    /// The engine could not fetch or decode the media.
    #[error("failed to load track {track_id}: {reason}")]
    Load { track_id: String, reason: String },
}

/// Why a next/previous step resolved to nothing. Never surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueMiss {
    #[error("play list is empty")]
    Empty,
    #[error("current track is not in the play list")]
    NotFound,
    #[error("nothing is playing")]
    NoCurrentTrack,
}
