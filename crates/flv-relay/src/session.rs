//! # Session bookkeeping
//!
//! State the accept loop carries from one encoder connection to the next,
//! and the policy deciding which frames of a session reach the output.

use std::fmt;

use flv::{FlvError, FlvFrame};

use crate::error::RelayError;

/// What to do with an incoming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    Forward,
    /// Metadata may appear only once in the output stream.
    DropMetadata,
    /// One of the leading frames a reconnected encoder repeats.
    DropLeading,
}

/// Cross-session state of the accept loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Ordinal of the current session, written into every frame's stream id.
    pub stream_num: u32,
    /// Offset added to every timestamp of the current session.
    pub preserved_ts: u32,
    /// Leading frames of the current session still to be dropped.
    pub skip_frames: u32,
    /// Output timestamp of the last frame forwarded by any session.
    pub last_forwarded_ts: u32,
    pub metadata_forwarded: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the drop policy to `frame`, consuming a skip slot if the
    /// frame is one of the leading frames of a continuation session.
    ///
    /// Metadata is checked first and never consumes a skip slot.
    pub fn decide(&mut self, frame: &FlvFrame) -> FrameDecision {
        if frame.is_script_tag() && (self.preserved_ts != 0 || self.metadata_forwarded) {
            return FrameDecision::DropMetadata;
        }
        if self.skip_frames > 0 {
            self.skip_frames -= 1;
            return FrameDecision::DropLeading;
        }
        FrameDecision::Forward
    }

    pub fn record_forwarded(&mut self, timestamp: u32, was_metadata: bool) {
        self.last_forwarded_ts = timestamp;
        self.metadata_forwarded |= was_metadata;
    }

    /// Reconnect transition, applied after every session that did not end
    /// because of shutdown.
    pub fn begin_next_session(&mut self, reconnect_gap_ms: u32, skip_frames: u32) {
        self.preserved_ts = self.last_forwarded_ts.saturating_add(reconnect_gap_ms);
        self.skip_frames = skip_frames;
        self.stream_num += 1;
    }
}

/// Why a session stopped.
#[derive(Debug)]
pub enum SessionEnd {
    /// Upstream closed the connection between frames.
    Closed,
    /// The first 9 bytes were not an FLV header.
    Handshake,
    /// Reading failed: reset, truncated frame, or malformed bytes.
    Read(FlvError),
    /// Writing to the output failed.
    Sink(RelayError),
    Shutdown,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Closed => write!(f, "connection closed"),
            SessionEnd::Handshake => write!(f, "not an FLV stream"),
            SessionEnd::Read(e) => write!(f, "read failed: {e}"),
            SessionEnd::Sink(e) => write!(f, "{e}"),
            SessionEnd::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Per-session counters, logged when the session ends.
#[derive(Debug)]
pub struct SessionSummary {
    pub stream_num: u32,
    pub forwarded: u64,
    pub dropped_metadata: u64,
    pub dropped_leading: u64,
    pub end: SessionEnd,
}

impl SessionSummary {
    pub fn new(stream_num: u32) -> Self {
        Self {
            stream_num,
            forwarded: 0,
            dropped_metadata: 0,
            dropped_leading: 0,
            end: SessionEnd::Closed,
        }
    }

    pub fn finish(mut self, end: SessionEnd) -> Self {
        self.end = end;
        self
    }
}
