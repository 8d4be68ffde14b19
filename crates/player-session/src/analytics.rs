//! Play-count reporting.
//!
//! Reports are fire-and-forget: the session hands them to a worker thread and
//! never waits on delivery. A full or closed channel drops the report.

use std::thread;

use crossbeam_channel::{Sender, TrySendError};

/// One "track started" event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayReport {
    pub track_id: String,
    pub user_id: String,
}

/// Sink for play reports.
pub trait AnalyticsReporter {
    fn report(&self, track_id: &str, user_id: &str);
}

/// Reporter that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl AnalyticsReporter for NoopReporter {
    fn report(&self, _track_id: &str, _user_id: &str) {}
}

/// Reporter backed by a bounded channel and one delivery thread.
pub struct ChannelReporter {
    tx: Sender<PlayReport>,
}

impl ChannelReporter {
    /// Spawn the delivery thread. `deliver` runs once per report; errors are logged.
    pub fn spawn<F>(capacity: usize, mut deliver: F) -> anyhow::Result<Self>
    where
        F: FnMut(&PlayReport) -> anyhow::Result<()> + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded::<PlayReport>(capacity.max(1));
        thread::Builder::new()
            .name("analytics".to_string())
            .spawn(move || {
                for report in rx.iter() {
                    if let Err(err) = deliver(&report) {
                        tracing::warn!(error = %err, track_id = %report.track_id, "play report failed");
                    }
                }
                tracing::debug!("analytics worker exiting");
            })?;
        Ok(Self { tx })
    }
}

impl AnalyticsReporter for ChannelReporter {
    fn report(&self, track_id: &str, user_id: &str) {
        let report = PlayReport {
            track_id: track_id.to_string(),
            user_id: user_id.to_string(),
        };
        match self.tx.try_send(report) {
            Ok(()) => {}
            Err(TrySendError::Full(report)) => {
                tracing::warn!(track_id = %report.track_id, "analytics backlog full; dropping report");
            }
            Err(TrySendError::Disconnected(report)) => {
                tracing::warn!(track_id = %report.track_id, "analytics worker gone; dropping report");
            }
        }
    }
}
