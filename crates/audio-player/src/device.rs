//! Output device selection.

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

/// Largest fixed callback buffer we ask for.
const MAX_BUFFER_FRAMES: u32 = 16_384;

/// First output device whose name contains `needle` (case-insensitive), or the default device.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let Some(needle) = needle.map(str::trim).filter(|n| !n.is_empty()) else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device"));
    };
    host.output_devices()
        .context("enumerate output devices")?
        .find(|d| device_name(d).is_some_and(|name| name_matches(&name, needle)))
        .ok_or_else(|| anyhow!("no output device matched {needle:?}"))
}

/// Names of every output device on `host`.
pub fn list_devices(host: &cpal::Host) -> Result<Vec<String>> {
    Ok(host
        .output_devices()
        .context("enumerate output devices")?
        .filter_map(|d| device_name(&d))
        .collect())
}

/// Best supported config for a source at `target_rate`.
///
/// Prefers the highest rate not above the target (so no upsampling when the
/// device can match), then the highest rate overall, then float formats.
pub fn pick_output_config(
    device: &cpal::Device,
    target_rate: Option<u32>,
) -> Result<cpal::SupportedStreamConfig> {
    device
        .supported_output_configs()
        .context("query output configs")?
        .map(|range| {
            let rate = rate_within(range.min_sample_rate(), range.max_sample_rate(), target_rate);
            let key = rank(rate, range.sample_format(), target_rate);
            (key, range.with_sample_rate(rate))
        })
        .max_by_key(|(key, _)| *key)
        .map(|(_, config)| config)
        .ok_or_else(|| anyhow!("device reports no output configs"))
}

/// Largest advertised callback buffer, capped. `None` lets CPAL choose.
pub fn pick_buffer_size(config: &cpal::SupportedStreamConfig) -> Option<cpal::BufferSize> {
    match config.buffer_size() {
        cpal::SupportedBufferSize::Range { min, max } => {
            Some(cpal::BufferSize::Fixed((*max).min(MAX_BUFFER_FRAMES).max(*min)))
        }
        cpal::SupportedBufferSize::Unknown => None,
    }
}

fn device_name(device: &cpal::Device) -> Option<String> {
    device.description().ok().map(|d| d.name().to_string())
}

fn name_matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(&needle.to_lowercase())
}

fn rate_within(min: u32, max: u32, target: Option<u32>) -> u32 {
    match target {
        Some(t) => t.clamp(min, max.max(min)),
        None => max,
    }
}

/// Ordering key: not-above-target first, then higher rate, then better format.
fn rank(rate: u32, format: cpal::SampleFormat, target: Option<u32>) -> (bool, u32, u8) {
    let not_above = target.is_none_or(|t| rate <= t);
    let format_score = match format {
        cpal::SampleFormat::F32 => 4,
        cpal::SampleFormat::I32 => 3,
        cpal::SampleFormat::I16 => 2,
        cpal::SampleFormat::U16 => 1,
        _ => 0,
    };
    (not_above, rate, format_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_match_is_case_insensitive() {
        assert!(name_matches("USB DAC", "dac"));
        assert!(name_matches("usb dac", "USB"));
        assert!(!name_matches("USB DAC", "speaker"));
    }

    #[test]
    fn rate_within_clamps_to_range() {
        assert_eq!(rate_within(44_100, 96_000, Some(48_000)), 48_000);
        assert_eq!(rate_within(44_100, 96_000, Some(22_050)), 44_100);
        assert_eq!(rate_within(44_100, 96_000, Some(192_000)), 96_000);
        assert_eq!(rate_within(44_100, 96_000, None), 96_000);
    }

    #[test]
    fn rank_prefers_not_above_target_then_rate_then_format() {
        use cpal::SampleFormat::*;
        let target = Some(48_000);
        assert!(rank(44_100, I16, target) > rank(96_000, F32, target));
        assert!(rank(48_000, I16, target) > rank(44_100, F32, target));
        assert!(rank(48_000, F32, target) > rank(48_000, I16, target));
        assert!(rank(96_000, I16, None) > rank(48_000, F32, None));
    }
}
