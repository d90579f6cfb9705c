//! # Frame publisher
//!
//! Owns the output sink together with the snapshot of the last published
//! frame. Both live behind one async mutex, so renumbering a frame, writing
//! it and recording it as the new [`LastFrameState`] happen as one step
//! whether the caller is the session loop or the keep-alive emitter.

use std::time::Duration;

use bytes::Bytes;
use flv::FlvFrame;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::error::RelayError;
use crate::renumber::{Renumbered, renumber};
use crate::sink::OutputSink;

/// Snapshot of the most recently published frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LastFrameState {
    /// The frame as it was received, before renumbering.
    pub frame: FlvFrame,
    pub published_at: Instant,
    pub preserved_ts: u32,
    pub stream_num: u32,
    /// Timestamp the frame carried on the output.
    pub last_timestamp: u32,
}

/// Counters kept by the publisher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub frames_published: u64,
    pub backups_sent: u64,
    pub bytes_written: u64,
}

struct PublisherInner<S> {
    sink: S,
    last: Option<LastFrameState>,
    header_written: bool,
    stats: PublisherStats,
}

impl<S: OutputSink> PublisherInner<S> {
    async fn emit(&mut self, renumbered: &Renumbered) -> Result<(), RelayError> {
        if renumbered.timestamp_overflowed() {
            warn!(
                timestamp = renumbered.last_timestamp,
                "Timestamp exceeds the 24-bit field, written value is truncated"
            );
        }

        let bytes = renumbered.frame.to_bytes();
        let len = bytes.len() as u64;
        self.sink.write(bytes).await.map_err(RelayError::Sink)?;
        self.stats.bytes_written += len;

        trace!("{}", renumbered.frame);
        Ok(())
    }
}

/// Single writer of the output stream.
pub struct FramePublisher<S> {
    inner: Mutex<PublisherInner<S>>,
}

impl<S: OutputSink> FramePublisher<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Mutex::new(PublisherInner {
                sink,
                last: None,
                header_written: false,
                stats: PublisherStats::default(),
            }),
        }
    }

    /// Writes the stream header unless a write was already attempted.
    ///
    /// Returns `true` if `header` reached the sink.
    pub async fn write_header(&self, header: Bytes) -> Result<bool, RelayError> {
        let mut inner = self.inner.lock().await;
        if inner.header_written {
            return Ok(false);
        }
        // Set before writing: a failed write may have left part of the
        // header in the sink, and a retry would append a second one.
        inner.header_written = true;
        let len = header.len() as u64;
        inner.sink.write(header).await.map_err(RelayError::Sink)?;
        inner.stats.bytes_written += len;
        debug!("FLV header forwarded");
        Ok(true)
    }

    /// Renumbers `frame`, writes it and records it as the last frame.
    ///
    /// Returns the timestamp the frame carries on the output.
    pub async fn publish(
        &self,
        frame: FlvFrame,
        preserved_ts: u32,
        stream_num: u32,
    ) -> Result<u32, RelayError> {
        let mut inner = self.inner.lock().await;
        let previous = inner.last.as_ref().map(|last| &last.frame);
        let renumbered = renumber(&frame, previous, preserved_ts, stream_num);
        inner.emit(&renumbered).await?;

        inner.stats.frames_published += 1;
        inner.last = Some(LastFrameState {
            frame,
            published_at: Instant::now(),
            preserved_ts,
            stream_num,
            last_timestamp: renumbered.last_timestamp,
        });
        Ok(renumbered.last_timestamp)
    }

    /// Publishes the last frame again if nothing was published for at
    /// least `threshold`.
    ///
    /// The copy goes through the same renumbering with the recorded offset
    /// and session ordinal, so it repeats the previous timestamp. Only the
    /// publish time is updated. Returns the repeated timestamp when a copy
    /// was sent.
    pub async fn republish_if_stale(&self, threshold: Duration) -> Result<Option<u32>, RelayError> {
        let mut inner = self.inner.lock().await;
        let renumbered = match inner.last.as_ref() {
            Some(last) if last.published_at.elapsed() >= threshold => renumber(
                &last.frame,
                Some(&last.frame),
                last.preserved_ts,
                last.stream_num,
            ),
            _ => return Ok(None),
        };
        inner.emit(&renumbered).await?;

        if let Some(last) = inner.last.as_mut() {
            last.published_at = Instant::now();
        }
        inner.stats.backups_sent += 1;
        Ok(Some(renumbered.last_timestamp))
    }

    pub async fn last_frame(&self) -> Option<LastFrameState> {
        self.inner.lock().await.last.clone()
    }

    pub async fn header_written(&self) -> bool {
        self.inner.lock().await.header_written
    }

    pub async fn stats(&self) -> PublisherStats {
        self.inner.lock().await.stats
    }

    pub fn into_sink(self) -> S {
        self.inner.into_inner().sink
    }
}
