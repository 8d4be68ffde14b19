//! Output stage: the CPAL stream and its real-time callback.
//!
//! The callback never blocks. It drains what the queue already holds, maps
//! channels, applies gain, and pads with silence on underrun. While paused it
//! writes silence and leaves the queue untouched.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::queue::{Pop, SampleQueue};

/// State shared between a playback session and its output callback.
#[derive(Debug)]
pub struct OutputControls {
    pub paused: AtomicBool,
    /// `f32` gain stored as raw bits.
    volume_bits: AtomicU32,
    /// Frames written to the device since the session started.
    pub played_frames: AtomicU64,
    /// Device rate of the running stream; `0` until the stream exists.
    pub sample_rate: AtomicU32,
}

impl OutputControls {
    pub fn new(volume: f32, paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(paused),
            volume_bits: AtomicU32::new(volume.clamp(0.0, 1.0).to_bits()),
            played_frames: AtomicU64::new(0),
            sample_rate: AtomicU32::new(0),
        }
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Seconds of audio written so far.
    pub fn played_secs(&self) -> f64 {
        let rate = self.sample_rate.load(Ordering::Relaxed);
        if rate == 0 {
            return 0.0;
        }
        self.played_frames.load(Ordering::Relaxed) as f64 / f64::from(rate)
    }
}

/// Open an output stream on `device` that plays `queue` (already at the device rate).
pub fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: cpal::SampleFormat,
    queue: Arc<SampleQueue>,
    controls: Arc<OutputControls>,
    refill_max_frames: usize,
) -> Result<cpal::Stream> {
    match format {
        cpal::SampleFormat::F32 => stream_for::<f32>(device, config, queue, controls, refill_max_frames),
        cpal::SampleFormat::I32 => stream_for::<i32>(device, config, queue, controls, refill_max_frames),
        cpal::SampleFormat::I16 => stream_for::<i16>(device, config, queue, controls, refill_max_frames),
        cpal::SampleFormat::U16 => stream_for::<u16>(device, config, queue, controls, refill_max_frames),
        other => Err(anyhow!("unsupported sample format {other:?}")),
    }
}

fn stream_for<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: Arc<SampleQueue>,
    controls: Arc<OutputControls>,
    refill_max_frames: usize,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut mixer = Mixer::new(queue.channels(), config.channels as usize);
    let refill = refill_max_frames.max(1);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            if controls.is_paused() {
                data.fill(<T as cpal::Sample>::from_sample::<f32>(0.0));
                return;
            }
            let gain = controls.volume();
            let written = mixer.fill(data, gain, || queue.pop(Pop::Available { max_frames: refill }));
            if written > 0 {
                controls
                    .played_frames
                    .fetch_add(written as u64, Ordering::Relaxed);
            }
        },
        |err| tracing::warn!(error = %err, "output stream error"),
        None,
    )?;
    Ok(stream)
}

/// Callback-side buffer plus channel mapping.
struct Mixer {
    src_channels: usize,
    dst_channels: usize,
    pending: Vec<f32>,
    pos: usize,
}

impl Mixer {
    fn new(src_channels: usize, dst_channels: usize) -> Self {
        Self {
            src_channels: src_channels.max(1),
            dst_channels: dst_channels.max(1),
            pending: Vec::new(),
            pos: 0,
        }
    }

    /// Write as many frames as are available into `out`, silence after that.
    /// Returns frames written from real audio.
    fn fill<T, F>(&mut self, out: &mut [T], gain: f32, mut refill: F) -> usize
    where
        T: cpal::Sample + cpal::FromSample<f32>,
        F: FnMut() -> Option<Vec<f32>>,
    {
        let frames = out.len() / self.dst_channels;
        for frame in 0..frames {
            if self.pos + self.src_channels > self.pending.len() {
                match refill() {
                    Some(block) => {
                        self.pending = block;
                        self.pos = 0;
                    }
                    None => {
                        out[frame * self.dst_channels..].fill(T::from_sample(0.0f32));
                        return frame;
                    }
                }
            }
            let src = &self.pending[self.pos..self.pos + self.src_channels];
            let dst = &mut out[frame * self.dst_channels..(frame + 1) * self.dst_channels];
            for (ch, slot) in dst.iter_mut().enumerate() {
                *slot = T::from_sample(map_channel(src, ch, self.dst_channels) * gain);
            }
            self.pos += self.src_channels;
        }
        frames
    }
}

/// Mono is duplicated, stereo folds to mono by averaging, anything else clamps to the last source channel.
fn map_channel(src: &[f32], dst_ch: usize, dst_channels: usize) -> f32 {
    match (src.len(), dst_channels) {
        (2, 1) => 0.5 * (src[0] + src[1]),
        (n, _) => src[dst_ch.min(n - 1)],
    }
}
