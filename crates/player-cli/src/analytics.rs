//! Play-count delivery to the catalog's analytics collector.

use std::time::Duration;

use anyhow::{Context, Result};
use player_session::{ChannelReporter, PlayReport};

/// Reports waiting for delivery before new ones are dropped.
const BACKLOG: usize = 64;

/// Spawn the reporter worker that posts to `{server}/api/analytics/track`.
pub fn spawn_reporter(server: &str, timeout: Duration) -> Result<ChannelReporter> {
    let server = server.trim_end_matches('/').to_string();
    ChannelReporter::spawn(BACKLOG, move |report| post_play(&server, report, timeout))
}

fn post_play(server: &str, report: &PlayReport, timeout: Duration) -> Result<()> {
    let url = track_url(server, &report.track_id);
    let resp = ureq::post(&url)
        .config()
        .timeout_per_call(Some(timeout))
        .build()
        .header("X-User-ID", report.user_id.as_str())
        .send_empty()
        .context("request /api/analytics/track")?;
    if !resp.status().is_success() {
        return Err(anyhow::anyhow!("play report failed with {}", resp.status()));
    }
    tracing::debug!(track_id = %report.track_id, "play reported");
    Ok(())
}

fn track_url(server: &str, track_id: &str) -> String {
    format!(
        "{}/api/analytics/track?song_id={}",
        server.trim_end_matches('/'),
        urlencoding::encode(track_id)
    )
}
