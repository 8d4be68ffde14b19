//! Sample-rate conversion stage.
//!
//! Pulls fixed-size chunks from the decode queue, runs them through Rubato's
//! async sinc resampler and pushes the result into a new queue at the device rate.

use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction, calculate_cutoff,
};

use crate::queue::{Pop, SampleQueue, capacity_for};

/// Spawn a resampler from `src` (at `src_rate`) to `dst_rate`.
///
/// The returned queue closes once `src` has closed and its tail has been flushed.
pub fn spawn(
    src: Arc<SampleQueue>,
    src_rate: u32,
    dst_rate: u32,
    chunk_frames: usize,
    buffer_seconds: f32,
) -> Result<Arc<SampleQueue>> {
    let channels = src.channels();
    let dst = Arc::new(SampleQueue::new(
        channels,
        capacity_for(dst_rate, channels, buffer_seconds),
    ));
    let chunk = chunk_frames.max(1);
    let ratio = f64::from(dst_rate) / f64::from(src_rate.max(1));

    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: calculate_cutoff(128, window),
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window,
    };

    let out = dst.clone();
    thread::Builder::new()
        .name("resample".to_string())
        .spawn(move || {
            let mut resampler = match Async::<f32>::new_sinc(
                ratio,
                1.1,
                &params,
                chunk,
                channels,
                FixedAsync::Input,
            ) {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(error = %e, "resampler init failed");
                    src.close();
                    out.close();
                    return;
                }
            };
            let mut scratch = vec![0.0f32; channels * chunk * 3];
            let mut indexing = Indexing {
                input_offset: 0,
                output_offset: 0,
                active_channels_mask: None,
                partial_len: None,
            };

            let mut run = |input: &[f32], partial: Option<usize>| -> bool {
                let frames = input.len() / channels;
                indexing.partial_len = partial;
                let produced = InterleavedSlice::new(input, channels, frames)
                    .map_err(|e| anyhow::anyhow!("{e}"))
                    .and_then(|input| {
                        let capacity = scratch.len() / channels;
                        let mut output = InterleavedSlice::new_mut(&mut scratch, channels, capacity)
                            .map_err(|e| anyhow::anyhow!("{e}"))?;
                        let (_, written) = resampler
                            .process_into_buffer(&input, &mut output, Some(&indexing))
                            .map_err(|e| anyhow::anyhow!("{e}"))?;
                        Ok(written)
                    });
                match produced {
                    Ok(frames_out) => {
                        out.push(&scratch[..frames_out * channels]);
                        true
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "resampler failed");
                        false
                    }
                }
            };

            let mut healthy = true;
            while let Some(block) = src.pop(Pop::Exact { frames: chunk }) {
                if !run(&block, None) {
                    healthy = false;
                    break;
                }
            }
            if healthy {
                while let Some(tail) = src.pop(Pop::UpTo { max_frames: chunk }) {
                    let frames = tail.len() / channels;
                    if !run(&tail, Some(frames)) {
                        break;
                    }
                }
            }
            src.close();
            out.close();
        })
        .context("spawn resample thread")?;

    Ok(dst)
}
