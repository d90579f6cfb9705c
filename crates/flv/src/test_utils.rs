//! # Test Utilities
//!
//! Helpers for building FLV byte streams in tests, shared with the relay
//! crate's test suites.

use bytes::{BufMut, Bytes, BytesMut};

use crate::header::FlvHeader;
use crate::parser_async::{FlvChunk, FlvFrameDecoder};
use crate::tag::{FlvFrame, FlvTagType};
use tokio_util::codec::Decoder;

/// A minimal `onMetaData` script tag.
pub fn script_frame(timestamp: u32) -> FlvFrame {
    let mut data = BytesMut::new();
    data.put_u8(0x02); // AMF0 string marker
    data.put_u16(10);
    data.put_slice(b"onMetaData");
    data.put_u8(0x08); // ECMA array marker
    data.put_u32(0);
    data.put_slice(&[0x00, 0x00, 0x09]); // object end
    FlvFrame::new(FlvTagType::ScriptData, timestamp, data.freeze())
}

/// An AVC video tag; the first byte carries the frame type.
pub fn video_frame(timestamp: u32, is_keyframe: bool) -> FlvFrame {
    let frame_type = if is_keyframe { 1 } else { 2 };
    let first_byte = (frame_type << 4) | 7; // AVC codec
    FlvFrame::new(
        FlvTagType::Video,
        timestamp,
        Bytes::from(vec![first_byte, 1, 0, 0, 0]),
    )
}

/// An AAC audio tag.
pub fn audio_frame(timestamp: u32) -> FlvFrame {
    FlvFrame::new(
        FlvTagType::Audio,
        timestamp,
        Bytes::from_static(&[0xAF, 1, 0x21, 0x10, 0x04]),
    )
}

/// Encodes a complete FLV stream the way a muxer would: header,
/// correctly chained PreviousTagSize fields and the trailing size field.
pub fn encode_stream(frames: &[FlvFrame]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_slice(&FlvHeader::new(true, true).to_bytes());
    let mut previous = 0;
    for frame in frames {
        let mut frame = frame.clone();
        frame.previous_tag_size = previous;
        frame.encode(&mut buf);
        previous = frame.tag_size();
    }
    buf.put_u32(previous);
    buf.to_vec()
}

/// Splits a byte buffer into its header and every complete frame.
/// Trailing bytes that do not form a frame are ignored.
pub fn decode_stream(bytes: &[u8]) -> (Option<Bytes>, Vec<FlvFrame>) {
    let mut decoder = FlvFrameDecoder::new();
    let mut buf = BytesMut::from(bytes);
    let mut header = None;
    let mut frames = Vec::new();
    while let Ok(Some(chunk)) = decoder.decode(&mut buf) {
        match chunk {
            FlvChunk::Header(h) => header = Some(h),
            FlvChunk::Frame(f) => frames.push(f),
        }
    }
    (header, frames)
}
