//! Bounded sample queue shared between pipeline stages.
//!
//! Decode → (resample) → output callback. Producers block when the queue is
//! full; the output callback only ever takes what is already there.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Interleaved `f32` samples with a fixed channel count and a sample cap.
pub struct SampleQueue {
    channels: usize,
    capacity: usize,
    inner: Mutex<Inner>,
    changed: Condvar,
}

struct Inner {
    samples: VecDeque<f32>,
    closed: bool,
}

/// How many frames a pop should wait for.
#[derive(Clone, Copy, Debug)]
pub enum Pop {
    /// Wait for exactly `frames`; `None` if the queue closes first.
    Exact { frames: usize },
    /// Wait for at least one frame, take up to `max_frames`.
    UpTo { max_frames: usize },
    /// Take up to `max_frames` of what is buffered now, never wait.
    Available { max_frames: usize },
}

/// Queue capacity in samples for `seconds` of audio. Falls back to two seconds.
pub fn capacity_for(rate_hz: u32, channels: usize, seconds: f32) -> usize {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        2.0
    };
    let frames = (rate_hz as f32 * seconds).ceil() as usize;
    frames.max(1).saturating_mul(channels.max(1))
}

impl SampleQueue {
    pub fn new(channels: usize, capacity_samples: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            capacity: capacity_samples.max(channels),
            inner: Mutex::new(Inner {
                samples: VecDeque::new(),
                closed: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn len_frames(&self) -> usize {
        self.lock().samples.len() / self.channels
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Mark the producer side finished and wake every waiter. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }

    /// Append samples, blocking while full. Remaining samples are dropped if the queue closes.
    pub fn push(&self, samples: &[f32]) {
        let mut rest = samples;
        while !rest.is_empty() {
            let mut g = self.lock();
            while g.samples.len() >= self.capacity && !g.closed {
                g = self.changed.wait(g).unwrap_or_else(PoisonError::into_inner);
            }
            if g.closed {
                return;
            }
            let room = self.capacity - g.samples.len();
            let (now, later) = rest.split_at(room.min(rest.len()));
            g.samples.extend(now.iter().copied());
            rest = later;
            drop(g);
            self.changed.notify_all();
        }
    }

    /// Remove whole frames according to `mode`.
    pub fn pop(&self, mode: Pop) -> Option<Vec<f32>> {
        let mut g = self.lock();
        let frames = match mode {
            Pop::Exact { frames } => {
                let want = frames * self.channels;
                while g.samples.len() < want && !g.closed {
                    g = self.changed.wait(g).unwrap_or_else(PoisonError::into_inner);
                }
                if g.samples.len() < want {
                    return None;
                }
                frames
            }
            Pop::UpTo { max_frames } => {
                while g.samples.len() < self.channels && !g.closed {
                    g = self.changed.wait(g).unwrap_or_else(PoisonError::into_inner);
                }
                (g.samples.len() / self.channels).min(max_frames)
            }
            Pop::Available { max_frames } => (g.samples.len() / self.channels).min(max_frames),
        };
        if frames == 0 {
            return None;
        }
        let out: Vec<f32> = g.samples.drain(..frames * self.channels).collect();
        drop(g);
        self.changed.notify_all();
        Some(out)
    }

    /// Wait until the queue is closed and drained, or `cancel` is raised.
    ///
    /// Returns `true` when the queue drained, `false` when cancelled.
    pub fn wait_drained_or_cancel(&self, cancel: &AtomicBool) -> bool {
        let mut g = self.lock();
        loop {
            if cancel.load(Ordering::Relaxed) {
                return false;
            }
            if g.closed && g.samples.is_empty() {
                return true;
            }
            g = self
                .changed
                .wait_timeout(g, Duration::from_millis(50))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
