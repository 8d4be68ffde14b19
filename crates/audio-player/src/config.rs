use std::time::Duration;

/// Tuning for the decode/resample/output stages.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Resampler input chunk size in frames.
    pub chunk_frames: usize,
    /// Max frames the output callback pulls per refill.
    pub refill_max_frames: usize,
    /// Target buffered audio per stage queue.
    pub buffer_seconds: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chunk_frames: 1024,
            refill_max_frames: 4096,
            buffer_seconds: 2.0,
        }
    }
}

impl PlaybackConfig {
    /// Smaller buffers after a seek so audio resumes quickly.
    pub fn for_seek(&self) -> Self {
        Self {
            chunk_frames: self.chunk_frames.min(1024),
            refill_max_frames: self.refill_max_frames.min(2048),
            buffer_seconds: self.buffer_seconds.min(1.0),
        }
    }
}

/// HTTP range fetching for remote media.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpConfig {
    /// Bytes per range request.
    pub block_size: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            block_size: 512 * 1024,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Everything a [`crate::player::StreamPlayer`] needs besides the URL.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineConfig {
    pub playback: PlaybackConfig,
    pub http: HttpConfig,
    /// Substring of the output device name; default device when unset.
    pub device: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_config_caps_buffers() {
        let cfg = PlaybackConfig {
            chunk_frames: 4096,
            refill_max_frames: 8192,
            buffer_seconds: 4.0,
        };
        let seek = cfg.for_seek();
        assert_eq!(seek.chunk_frames, 1024);
        assert_eq!(seek.refill_max_frames, 2048);
        assert_eq!(seek.buffer_seconds, 1.0);
    }

    #[test]
    fn seek_config_keeps_small_values() {
        let cfg = PlaybackConfig {
            chunk_frames: 256,
            refill_max_frames: 512,
            buffer_seconds: 0.5,
        };
        assert_eq!(cfg.for_seek(), cfg);
    }
}
