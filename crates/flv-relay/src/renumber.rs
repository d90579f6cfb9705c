//! # Frame renumbering
//!
//! Rewrites the header fields of a frame so that frames coming from many
//! short encoder sessions read as one stream:
//!
//! - the timestamp is shifted by the session offset (`preserved_ts`), so the
//!   timeline never goes backwards when a restarted encoder starts at zero
//! - the stream id carries the session ordinal, a diagnostic marker telling
//!   which physical connection a frame came from
//! - PreviousTagSize is recomputed from the frame actually written before it
//!
//! The transform is pure; writing the result is the publisher's job.

use flv::FlvFrame;
use flv::tag::{MAX_U24, TAG_HEADER_SIZE};

/// PreviousTagSize given to a metadata frame that opens a continuation
/// session.
pub const CONTINUATION_METADATA_PREV_SIZE: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Renumbered {
    /// The frame with rewritten header fields, ready to serialise.
    pub frame: FlvFrame,
    /// `preserved_ts + ts`, before any truncation to the 24-bit field.
    pub last_timestamp: u32,
}

impl Renumbered {
    /// Whether the timestamp no longer fits the 24-bit field and was
    /// truncated on the wire.
    pub fn timestamp_overflowed(&self) -> bool {
        self.last_timestamp > MAX_U24
    }
}

/// Renumbers `frame` for the virtual output stream.
///
/// `previous` is the frame most recently written to the output, if any.
pub fn renumber(
    frame: &FlvFrame,
    previous: Option<&FlvFrame>,
    preserved_ts: u32,
    stream_num: u32,
) -> Renumbered {
    let mut out = frame.clone();
    let ts = frame.timestamp & MAX_U24;

    if preserved_ts != 0 && frame.is_script_tag() {
        out.previous_tag_size = CONTINUATION_METADATA_PREV_SIZE;
    } else if let Some(previous) = previous {
        out.previous_tag_size = TAG_HEADER_SIZE as u32 + previous.data_size;
    }

    let last_timestamp = preserved_ts.saturating_add(ts);
    out.timestamp = last_timestamp & MAX_U24;
    out.stream_id = stream_num & MAX_U24;

    Renumbered {
        frame: out,
        last_timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flv::test_utils::{audio_frame, script_frame, video_frame};

    #[test]
    fn test_first_frame_keeps_previous_size() {
        let mut frame = script_frame(0);
        frame.previous_tag_size = 0;

        let result = renumber(&frame, None, 0, 0);
        assert_eq!(result.frame.previous_tag_size, 0);
        assert_eq!(result.last_timestamp, 0);
        assert_eq!(result.frame.stream_id, 0);
    }

    #[test]
    fn test_previous_size_chains_from_previous_payload() {
        let previous = video_frame(40, true);
        let mut frame = audio_frame(41);
        frame.previous_tag_size = 999;

        let result = renumber(&frame, Some(&previous), 0, 0);
        assert_eq!(result.frame.previous_tag_size, 11 + previous.data_size);
        assert_eq!(result.frame.timestamp, 41);
    }

    #[test]
    fn test_continuation_metadata_pinned_to_16() {
        let previous = video_frame(40, true);
        let result = renumber(&script_frame(0), Some(&previous), 1041, 1);
        assert_eq!(result.frame.previous_tag_size, 16);
        assert_eq!(result.frame.timestamp, 1041);

        // no offset means no pinning
        let result = renumber(&script_frame(0), Some(&previous), 0, 0);
        assert_eq!(result.frame.previous_tag_size, 11 + previous.data_size);
    }

    #[test]
    fn test_offset_and_stream_id_applied() {
        let previous = audio_frame(41);
        let result = renumber(&audio_frame(90), Some(&previous), 1041, 1);

        assert_eq!(result.last_timestamp, 1131);
        assert_eq!(result.frame.timestamp, 1131);
        assert_eq!(result.frame.stream_id, 1);
        assert_eq!(result.frame.data, audio_frame(90).data);
    }

    #[test]
    fn test_input_frame_is_untouched() {
        let frame = video_frame(10, false);
        let before = frame.clone();
        let _ = renumber(&frame, None, 5000, 3);
        assert_eq!(frame, before);
    }

    // Boundary: the accumulated timestamp outgrows the 24-bit field. No
    // wraparound policy is applied; the field carries the low 24 bits and
    // the full value keeps feeding the continuity bookkeeping.
    #[test]
    fn test_timestamp_beyond_24_bits() {
        let preserved_ts = MAX_U24 - 10;
        let result = renumber(&video_frame(20, true), None, preserved_ts, 0);

        assert_eq!(result.last_timestamp, MAX_U24 + 10);
        assert!(result.timestamp_overflowed());
        assert_eq!(result.frame.timestamp, 9);

        let in_range = renumber(&video_frame(10, true), None, preserved_ts, 0);
        assert!(!in_range.timestamp_overflowed());
        assert_eq!(in_range.frame.timestamp, MAX_U24);
    }
}
