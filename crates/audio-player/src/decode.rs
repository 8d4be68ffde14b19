//! Decode stage.
//!
//! Probes the container with Symphonia, optionally seeks, then decodes packets
//! to interleaved `f32` on a background thread that feeds a [`SampleQueue`].

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result, anyhow};
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecParameters, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

use crate::queue::{SampleQueue, capacity_for};

/// A running decode stage.
pub struct Decoded {
    pub spec: SignalSpec,
    pub queue: Arc<SampleQueue>,
    /// Track length when the container reports a frame count.
    pub duration_secs: Option<f64>,
    pub codec: Option<&'static str>,
}

/// Build a Symphonia hint from a lowercase extension such as `mp3`.
pub fn hint_for(extension: Option<&str>) -> Hint {
    let mut hint = Hint::new();
    if let Some(ext) = extension.map(str::trim).filter(|e| !e.is_empty()) {
        hint.with_extension(ext);
    }
    hint
}

/// Probe `source` and start decoding from `start_secs`.
///
/// The decode thread stops early when `cancel` is raised and sets `failed`
/// when the stream breaks before a clean end.
pub fn start(
    source: Box<dyn MediaSource>,
    hint: Hint,
    buffer_seconds: f32,
    start_secs: f64,
    cancel: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
) -> Result<Decoded> {
    let mss = MediaSourceStream::new(source, Default::default());
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("probe media")?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("no default audio track"))?;
    let params: CodecParameters = track.codec_params.clone();
    let rate = params.sample_rate.ok_or_else(|| anyhow!("unknown sample rate"))?;
    let layout = params.channels.ok_or_else(|| anyhow!("unknown channel layout"))?;
    let spec = SignalSpec::new(rate, layout);
    let channels = layout.count();

    if start_secs > 0.0 && start_secs.is_finite() {
        let time = Time::new(start_secs.trunc() as u64, start_secs.fract());
        if let Err(e) = format.seek(SeekMode::Accurate, SeekTo::Time { time, track_id: None }) {
            tracing::warn!(error = %e, start_secs, "seek failed; starting from the top");
        }
    }

    let queue = Arc::new(SampleQueue::new(channels, capacity_for(rate, channels, buffer_seconds)));
    let decoded = Decoded {
        spec,
        queue: queue.clone(),
        duration_secs: duration_secs(&params),
        codec: codec_label(&params),
    };

    thread::Builder::new()
        .name("decode".to_string())
        .spawn(move || {
            if let Err(e) = decode_loop(format, &params, &queue, &cancel) {
                if !cancel.load(Ordering::Relaxed) {
                    tracing::warn!(error = %e, "decode stopped early");
                    failed.store(true, Ordering::Relaxed);
                }
            }
            queue.close();
        })
        .context("spawn decode thread")?;

    Ok(decoded)
}

fn decode_loop(
    mut format: Box<dyn FormatReader>,
    params: &CodecParameters,
    queue: &SampleQueue,
    cancel: &AtomicBool,
) -> Result<()> {
    let mut decoder = symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .context("create decoder")?;

    while !cancel.load(Ordering::Relaxed) {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("read packet"),
        };
        let audio = match decoder.decode(&packet) {
            Ok(audio) => audio,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(error = e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e).context("decode packet"),
        };

        let mut buf = SampleBuffer::<f32>::new(audio.frames() as u64, *audio.spec());
        buf.copy_interleaved_ref(audio);
        queue.push(buf.samples());
    }
    Ok(())
}

fn duration_secs(params: &CodecParameters) -> Option<f64> {
    let frames = params.n_frames?;
    let rate = params.sample_rate.filter(|r| *r > 0)?;
    Some(frames as f64 / f64::from(rate))
}

fn codec_label(params: &CodecParameters) -> Option<&'static str> {
    use symphonia::core::codecs::*;
    Some(match params.codec {
        CODEC_TYPE_MP3 => "mp3",
        CODEC_TYPE_AAC => "aac",
        CODEC_TYPE_FLAC => "flac",
        CODEC_TYPE_ALAC => "alac",
        CODEC_TYPE_VORBIS => "vorbis",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "pcm16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "pcm24",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "pcmf32",
        _ => return None,
    })
}
