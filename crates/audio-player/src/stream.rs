//! Seekable HTTP media source.
//!
//! Reads a remote file in fixed-size blocks with `Range` requests so the
//! decoder can probe and seek without downloading the whole track.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use symphonia::core::io::MediaSource;

use crate::config::HttpConfig;

/// Blocking range reader over one URL with a single-block cache.
pub struct RangeReader {
    url: String,
    config: HttpConfig,
    pos: u64,
    len: Option<u64>,
    block: Vec<u8>,
    block_start: u64,
    cancel: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
}

impl RangeReader {
    /// `cancel` turns reads into EOF; `failed` is raised on any transport error.
    pub fn new(
        url: impl Into<String>,
        config: HttpConfig,
        cancel: Arc<AtomicBool>,
        failed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            url: url.into(),
            config,
            pos: 0,
            len: None,
            block: Vec::new(),
            block_start: 0,
            cancel,
            failed,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn block_contains(&self, pos: u64) -> bool {
        pos >= self.block_start && pos < self.block_start + self.block.len() as u64
    }

    fn total_len(&mut self) -> io::Result<u64> {
        if let Some(len) = self.len {
            return Ok(len);
        }
        let (data, total) = self.fetch(0, 0)?;
        let total = total.ok_or_else(|| io::Error::other("content length unavailable"))?;
        self.block = data;
        self.block_start = 0;
        self.len = Some(total);
        Ok(total)
    }

    fn fill_block(&mut self) -> io::Result<()> {
        let start = self.pos;
        let mut end = start.saturating_add(self.config.block_size.max(1) as u64) - 1;
        if let Some(len) = self.len.filter(|len| *len > 0) {
            end = end.min(len - 1);
        }
        let (data, total) = self.fetch(start, end)?;
        if total.is_some() {
            self.len = total;
        }
        self.block = data;
        self.block_start = start;
        Ok(())
    }

    /// GET `bytes=start-end`; returns the body and the total length when the server reports it.
    fn fetch(&self, start: u64, end: u64) -> io::Result<(Vec<u8>, Option<u64>)> {
        let range = format!("bytes={start}-{end}");
        let began = Instant::now();
        let result = ureq::get(&self.url)
            .config()
            .timeout_per_call(Some(self.config.timeout))
            .build()
            .header("Range", &range)
            .call();
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                self.failed.store(true, Ordering::Relaxed);
                return Err(io::Error::other(format!("range request {range} failed: {e}")));
            }
        };

        let status = resp.status();
        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_range = header("Content-Range");
        let content_length = header("Content-Length").and_then(|v| v.parse::<u64>().ok());

        let mut body = Vec::new();
        let (_, reader) = resp.into_parts();
        if let Err(e) = reader.into_reader().read_to_end(&mut body) {
            self.failed.store(true, Ordering::Relaxed);
            return Err(io::Error::other(format!("range body read failed: {e}")));
        }

        let took = began.elapsed();
        if took > Duration::from_millis(250) {
            tracing::warn!(
                took_ms = took.as_millis() as u64,
                bytes = body.len(),
                range = range.as_str(),
                "slow range fetch"
            );
        }

        let total = if status == ureq::http::StatusCode::PARTIAL_CONTENT {
            content_range
                .as_deref()
                .and_then(total_from_content_range)
                .or(content_length)
        } else if status == ureq::http::StatusCode::OK {
            content_length
        } else {
            None
        };
        Ok((body, total))
    }
}

impl Read for RangeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.cancelled() {
            return Ok(0);
        }
        if self.len.is_some_and(|len| self.pos >= len) {
            return Ok(0);
        }
        if !self.block_contains(self.pos) {
            self.fill_block()?;
            if !self.block_contains(self.pos) {
                return Ok(0);
            }
        }

        let offset = (self.pos - self.block_start) as usize;
        let n = (self.block.len() - offset).min(out.len());
        out[..n].copy_from_slice(&self.block[offset..offset + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for RangeReader {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        self.pos = match from {
            SeekFrom::Start(pos) => pos,
            SeekFrom::Current(delta) => offset_by(self.pos, delta),
            SeekFrom::End(delta) => {
                let len = self.total_len()?;
                offset_by(len, delta)
            }
        };
        Ok(self.pos)
    }
}

impl MediaSource for RangeReader {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.len
    }
}

/// Total from `bytes a-b/total`; `*` means unknown.
fn total_from_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn offset_by(base: u64, delta: i64) -> u64 {
    if delta >= 0 {
        base.saturating_add(delta as u64)
    } else {
        base.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> RangeReader {
        RangeReader::new(
            "http://127.0.0.1:9/none.mp3",
            HttpConfig::default(),
            Arc::new(AtomicBool::new(false)),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn content_range_total() {
        assert_eq!(total_from_content_range("bytes 0-99/12345"), Some(12345));
        assert_eq!(total_from_content_range("bytes 0-99/*"), None);
        assert_eq!(total_from_content_range("bytes 0-99"), None);
    }

    #[test]
    fn offset_by_saturates() {
        assert_eq!(offset_by(10, 5), 15);
        assert_eq!(offset_by(10, -3), 7);
        assert_eq!(offset_by(5, -10), 0);
        assert_eq!(offset_by(u64::MAX, 1), u64::MAX);
        assert_eq!(offset_by(u64::MAX, i64::MIN), u64::MAX - (1u64 << 63));
    }

    #[test]
    fn seek_from_start_and_current_needs_no_network() {
        let mut r = reader();
        assert_eq!(r.seek(SeekFrom::Start(100)).unwrap(), 100);
        assert_eq!(r.seek(SeekFrom::Current(-40)).unwrap(), 60);
        assert!(!r.failed.load(Ordering::Relaxed));
    }

    #[test]
    fn cancelled_reader_reads_eof() {
        let r = reader();
        r.cancel.store(true, Ordering::Relaxed);
        let mut r = r;
        let mut buf = [0u8; 16];
        assert_eq!(r.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn unreachable_host_marks_failure() {
        let mut r = reader();
        r.config.timeout = Duration::from_millis(500);
        let mut buf = [0u8; 16];
        assert!(r.read(&mut buf).is_err());
        assert!(r.failed.load(Ordering::Relaxed));
    }
}
