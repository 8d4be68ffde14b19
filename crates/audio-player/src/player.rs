//! One streaming playback per [`Playback`] handle.
//!
//! A handle owns at most one worker session. Seeking replaces the session
//! with a new one that starts at the requested offset; the replaced session is
//! cancelled and its end is never reported. Only the newest session of a
//! handle reports how it ended.
//!
//! A cancelled worker blocked in a range request cannot notice the flag until
//! the request returns, so teardown waits at most [`STOP_GRACE`] and then
//! leaves the thread to finish on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::StreamTrait;
use player_types::PlaybackEndReason;

use crate::config::EngineConfig;
use crate::output::OutputControls;
use crate::stream::RangeReader;
use crate::{decode, device, output, resample};

/// How long teardown waits for a cancelled worker before detaching it.
pub const STOP_GRACE: Duration = Duration::from_millis(200);

/// What a playback reports back to its owner.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Media probed and output started.
    Ready { duration_secs: Option<f64> },
    /// Playback finished on its own (`Eof`) or broke (`Error`).
    Ended {
        reason: PlaybackEndReason,
        detail: Option<String>,
    },
}

/// Callback receiving [`StreamEvent`]s from worker threads.
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Factory for [`Playback`]s sharing one engine configuration.
#[derive(Clone, Debug, Default)]
pub struct StreamPlayer {
    config: EngineConfig,
}

impl StreamPlayer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start streaming `url` in the background. Returns immediately; probe
    /// and device errors arrive as [`StreamEvent::Ended`] with `Error`.
    pub fn open(
        &self,
        url: &str,
        format_hint: Option<&str>,
        volume: f32,
        on_event: EventCallback,
    ) -> Result<Playback> {
        let mut playback = Playback {
            url: url.to_string(),
            format_hint: format_hint.map(str::to_string),
            config: self.config.clone(),
            controls: Arc::new(OutputControls::new(volume, false)),
            start_secs: 0.0,
            latest: Arc::new(AtomicU64::new(0)),
            worker: None,
            on_event,
        };
        playback.start_session(0.0, true)?;
        Ok(playback)
    }
}

struct Worker {
    cancel: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl Worker {
    /// Cancel and join within `grace`; a worker still running after that is
    /// joined from a detached thread instead.
    fn retire(self, grace: Duration) {
        self.cancel.store(true, Ordering::Relaxed);
        let deadline = Instant::now() + grace;
        while !self.join.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if self.join.is_finished() {
            let _ = self.join.join();
            return;
        }
        if !grace.is_zero() {
            tracing::debug!("playback worker still busy; detaching");
        }
        let join = self.join;
        let _ = thread::Builder::new()
            .name("playback-reaper".to_string())
            .spawn(move || {
                let _ = join.join();
            });
    }
}

/// Handle to a streaming track.
pub struct Playback {
    url: String,
    format_hint: Option<String>,
    config: EngineConfig,
    controls: Arc<OutputControls>,
    /// Offset the current session started from.
    start_secs: f64,
    /// Id of the newest session; older sessions stay silent when they end.
    latest: Arc<AtomicU64>,
    worker: Option<Worker>,
    on_event: EventCallback,
}

impl Playback {
    pub fn play(&self) {
        self.controls.paused.store(false, Ordering::Relaxed);
    }

    pub fn pause(&self) {
        self.controls.paused.store(true, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.controls.is_paused()
    }

    pub fn set_volume(&self, volume: f32) {
        self.controls.set_volume(volume);
    }

    /// Seconds into the track.
    pub fn position_secs(&self) -> f64 {
        self.start_secs + self.controls.played_secs()
    }

    /// Restart streaming at `position_secs`, keeping pause state and volume.
    pub fn seek(&mut self, position_secs: f64) -> Result<()> {
        let target = if position_secs.is_finite() { position_secs.max(0.0) } else { 0.0 };
        tracing::debug!(url = %self.url, target, "seek");
        self.start_session(target, false)
    }

    /// Cancel the session. Returns within [`STOP_GRACE`] even when the
    /// worker is stuck on the network.
    pub fn stop(&mut self) {
        self.latest.fetch_add(1, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            worker.retire(STOP_GRACE);
        }
    }

    fn start_session(&mut self, start_secs: f64, wait_for_previous: bool) -> Result<()> {
        let my_id = self.latest.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if let Some(old) = self.worker.take() {
            old.retire(if wait_for_previous { STOP_GRACE } else { Duration::ZERO });
        }

        self.start_secs = start_secs;
        self.controls.played_frames.store(0, Ordering::Relaxed);

        let cancel = Arc::new(AtomicBool::new(false));
        let job = SessionJob {
            url: self.url.clone(),
            format_hint: self.format_hint.clone(),
            config: self.config.clone(),
            start_secs,
            controls: self.controls.clone(),
            cancel: cancel.clone(),
        };
        let latest = self.latest.clone();
        let on_event = self.on_event.clone();
        let join = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let end = run_session(&job, &on_event);
                if latest.load(Ordering::Relaxed) != my_id || job.cancel.load(Ordering::Relaxed) {
                    return;
                }
                match end {
                    Ok(SessionEnd::Drained) => on_event(StreamEvent::Ended {
                        reason: PlaybackEndReason::Eof,
                        detail: None,
                    }),
                    Ok(SessionEnd::Cancelled) => {}
                    Err(e) => {
                        tracing::warn!(url = %job.url, "playback failed: {e:#}");
                        on_event(StreamEvent::Ended {
                            reason: PlaybackEndReason::Error,
                            detail: Some(format!("{e:#}")),
                        });
                    }
                }
            })
            .context("spawn playback thread")?;

        self.worker = Some(Worker { cancel, join });
        Ok(())
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

struct SessionJob {
    url: String,
    format_hint: Option<String>,
    config: EngineConfig,
    start_secs: f64,
    controls: Arc<OutputControls>,
    cancel: Arc<AtomicBool>,
}

enum SessionEnd {
    Drained,
    Cancelled,
}

/// Fetch, decode and play one session; blocks until drained, cancelled or failed.
fn run_session(job: &SessionJob, on_event: &EventCallback) -> Result<SessionEnd> {
    let playback = if job.start_secs > 0.0 {
        job.config.playback.for_seek()
    } else {
        job.config.playback.clone()
    };
    let failed = Arc::new(AtomicBool::new(false));
    let source = RangeReader::new(
        job.url.clone(),
        job.config.http.clone(),
        job.cancel.clone(),
        failed.clone(),
    );
    let decoded = decode::start(
        Box::new(source),
        decode::hint_for(job.format_hint.as_deref()),
        playback.buffer_seconds,
        job.start_secs,
        job.cancel.clone(),
        failed.clone(),
    )
    .with_context(|| format!("open {}", job.url))?;
    if job.cancel.load(Ordering::Relaxed) {
        decoded.queue.close();
        return Ok(SessionEnd::Cancelled);
    }

    let host = cpal::default_host();
    let device = device::pick_device(&host, job.config.device.as_deref())?;
    let supported = device::pick_output_config(&device, Some(decoded.spec.rate))?;
    let mut stream_config: cpal::StreamConfig = supported.config();
    if let Some(size) = device::pick_buffer_size(&supported) {
        stream_config.buffer_size = size;
    }
    let device_rate = stream_config.sample_rate;

    let src_queue = decoded.queue.clone();
    let out_queue = if decoded.spec.rate == device_rate {
        decoded.queue.clone()
    } else {
        tracing::debug!(from_hz = decoded.spec.rate, to_hz = device_rate, "resampling");
        resample::spawn(
            decoded.queue.clone(),
            decoded.spec.rate,
            device_rate,
            playback.chunk_frames,
            playback.buffer_seconds,
        )?
    };

    job.controls.sample_rate.store(device_rate, Ordering::Relaxed);
    let stream = output::build_stream(
        &device,
        &stream_config,
        supported.sample_format(),
        out_queue.clone(),
        job.controls.clone(),
        playback.refill_max_frames,
    )?;
    stream.play().context("start output stream")?;

    tracing::info!(
        url = %job.url,
        codec = decoded.codec.unwrap_or("unknown"),
        rate_hz = decoded.spec.rate,
        device_rate_hz = device_rate,
        start_secs = job.start_secs,
        "stream started"
    );
    on_event(StreamEvent::Ready {
        duration_secs: decoded.duration_secs,
    });

    let drained = out_queue.wait_drained_or_cancel(&job.cancel);
    if !drained {
        src_queue.close();
        out_queue.close();
        return Ok(SessionEnd::Cancelled);
    }

    // Let the device play out its last callback buffer.
    thread::sleep(Duration::from_millis(100));
    if failed.load(Ordering::Relaxed) {
        anyhow::bail!("stream interrupted");
    }
    Ok(SessionEnd::Drained)
}
