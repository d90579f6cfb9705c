use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

/// Size of the PreviousTagSize field that precedes every tag header.
pub const PREV_TAG_SIZE_FIELD: usize = 4;
/// Size of the fixed tag header (type, data size, timestamp, stream id).
pub const TAG_HEADER_SIZE: usize = 11;
/// Bytes needed before the payload length of a frame is known.
pub const FRAME_PREFIX_SIZE: usize = PREV_TAG_SIZE_FIELD + TAG_HEADER_SIZE;
/// Largest value a 24-bit field can carry.
pub const MAX_U24: u32 = 0xFF_FFFF;
/// Low bits of the type byte holding the tag type.
const TAG_TYPE_MASK: u8 = 0x1F;

/// FLV Tag Type
///
/// Defined by:
/// - video_file_format_spec_v10.pdf (Chapter 1 - The FLV File Format - FLV tags)
/// - video_file_format_spec_v10_1.pdf (Annex E.4.1 - FLV Tag)
///
/// The 3 types that are supported are:
/// - Audio(8)
/// - Video(9)
/// - ScriptData(18)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlvTagType {
    Audio,
    Video,
    ScriptData,
    Unknown(u8),
}

impl From<u8> for FlvTagType {
    fn from(value: u8) -> Self {
        match value {
            8 => FlvTagType::Audio,
            9 => FlvTagType::Video,
            18 => FlvTagType::ScriptData,
            _ => FlvTagType::Unknown(value),
        }
    }
}

impl From<FlvTagType> for u8 {
    fn from(value: FlvTagType) -> Self {
        match value {
            FlvTagType::Audio => 8,
            FlvTagType::Video => 9,
            FlvTagType::ScriptData => 18,
            FlvTagType::Unknown(v) => v,
        }
    }
}

/// One FLV tag exactly as it crosses the wire, together with the
/// PreviousTagSize field that precedes it.
///
/// Nothing in the payload is demuxed; the relay only ever rewrites header
/// fields, so the payload stays a cheap [`Bytes`] handle.
///
/// Wire layout: `previous_tag_size(4) | flags + type(1) | data_size(3) |
/// timestamp(3) | timestamp_extended(1) | stream_id(3) | data(data_size)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlvFrame {
    pub previous_tag_size: u32,
    pub tag_type: FlvTagType,
    /// Reserved and filter bits sharing the byte with the tag type,
    /// written back unchanged.
    pub type_flags: u8,
    /// Payload size as announced by the tag header.
    pub data_size: u32,
    /// Lower 24 bits of the timestamp, in milliseconds.
    pub timestamp: u32,
    /// Upper 8 bits of the timestamp. Carried through untouched.
    pub timestamp_extended: u8,
    pub stream_id: u32,
    pub data: Bytes,
}

impl FlvFrame {
    /// Builds a frame around `data` with a matching `data_size`.
    pub fn new(tag_type: FlvTagType, timestamp: u32, data: Bytes) -> Self {
        Self {
            previous_tag_size: 0,
            tag_type,
            type_flags: 0,
            data_size: data.len() as u32,
            timestamp: timestamp & MAX_U24,
            timestamp_extended: 0,
            stream_id: 0,
            data,
        }
    }

    /// Parses the 15-byte frame prefix (PreviousTagSize + tag header).
    ///
    /// The returned frame has an empty payload; the caller attaches the
    /// `data_size` bytes that follow.
    pub fn parse_prefix(prefix: &[u8; FRAME_PREFIX_SIZE]) -> Self {
        let previous_tag_size = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        let h = &prefix[PREV_TAG_SIZE_FIELD..];
        Self {
            previous_tag_size,
            tag_type: FlvTagType::from(h[0] & TAG_TYPE_MASK),
            type_flags: h[0] & !TAG_TYPE_MASK,
            data_size: read_u24(&h[1..4]),
            timestamp: read_u24(&h[4..7]),
            timestamp_extended: h[7],
            stream_id: read_u24(&h[8..11]),
            data: Bytes::new(),
        }
    }

    /// Writes the frame in wire order into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.size());
        dst.put_u32(self.previous_tag_size);
        dst.put_u8(self.type_flags | (u8::from(self.tag_type) & TAG_TYPE_MASK));
        dst.put_uint((self.data_size & MAX_U24) as u64, 3);
        dst.put_uint((self.timestamp & MAX_U24) as u64, 3);
        dst.put_u8(self.timestamp_extended);
        dst.put_uint((self.stream_id & MAX_U24) as u64, 3);
        dst.put_slice(&self.data);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.size());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Total number of bytes the frame occupies on the wire.
    pub fn size(&self) -> usize {
        FRAME_PREFIX_SIZE + self.data.len()
    }

    /// Size of the tag itself (header + payload), the value the next
    /// frame's PreviousTagSize should carry.
    pub fn tag_size(&self) -> u32 {
        TAG_HEADER_SIZE as u32 + self.data_size
    }

    pub fn is_script_tag(&self) -> bool {
        self.tag_type == FlvTagType::ScriptData
    }

    pub fn is_audio_tag(&self) -> bool {
        self.tag_type == FlvTagType::Audio
    }

    pub fn is_video_tag(&self) -> bool {
        self.tag_type == FlvTagType::Video
    }
}

impl fmt::Display for FlvFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} DTS:{} PPS:{} CPS:{}",
            u8::from(self.tag_type),
            self.timestamp,
            self.previous_tag_size,
            self.data_size
        )
    }
}

fn read_u24(b: &[u8]) -> u32 {
    ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | b[2] as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_type_conversions() {
        assert_eq!(FlvTagType::from(8), FlvTagType::Audio);
        assert_eq!(FlvTagType::from(9), FlvTagType::Video);
        assert_eq!(FlvTagType::from(18), FlvTagType::ScriptData);
        assert_eq!(FlvTagType::from(7), FlvTagType::Unknown(7));
        assert_eq!(u8::from(FlvTagType::ScriptData), 18);
        assert_eq!(u8::from(FlvTagType::Unknown(42)), 42);
    }

    #[test]
    fn test_encode_layout() {
        let mut frame = FlvFrame::new(
            FlvTagType::Video,
            100,
            Bytes::from_static(&[0xAA, 0xBB, 0xCC, 0xDD]),
        );
        frame.previous_tag_size = 0x13;
        frame.stream_id = 2;

        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), frame.size());
        assert_eq!(
            &bytes[..],
            &[
                0x00, 0x00, 0x00, 0x13, // PreviousTagSize
                0x09, // Type: Video
                0x00, 0x00, 0x04, // Data Size: 4
                0x00, 0x00, 0x64, // Timestamp: 100
                0x00, // Timestamp Extended
                0x00, 0x00, 0x02, // Stream ID: 2
                0xAA, 0xBB, 0xCC, 0xDD,
            ]
        );
    }

    #[test]
    fn test_parse_prefix_reads_every_field() {
        let prefix: [u8; FRAME_PREFIX_SIZE] = [
            0x00, 0x00, 0x00, 0x1B, // PreviousTagSize: 27
            0x12, // Type: ScriptData
            0x00, 0x01, 0x00, // Data Size: 256
            0x01, 0x02, 0x03, // Timestamp
            0x7F, // Timestamp Extended
            0x00, 0x00, 0x05, // Stream ID
        ];
        let frame = FlvFrame::parse_prefix(&prefix);
        assert_eq!(frame.previous_tag_size, 27);
        assert!(frame.is_script_tag());
        assert_eq!(frame.data_size, 256);
        assert_eq!(frame.timestamp, 0x010203);
        assert_eq!(frame.timestamp_extended, 0x7F);
        assert_eq!(frame.stream_id, 5);
        assert!(frame.data.is_empty());
    }

    #[test]
    fn test_filter_bit_survives_reencoding() {
        let mut prefix = [0u8; FRAME_PREFIX_SIZE];
        prefix[4] = 0x29; // filter bit + video
        let frame = FlvFrame::parse_prefix(&prefix);

        assert!(frame.is_video_tag());
        assert_eq!(frame.type_flags, 0x20);
        assert_eq!(frame.to_bytes()[4], 0x29);
    }

    #[test]
    fn test_oversized_fields_are_masked_to_24_bits() {
        let mut frame = FlvFrame::new(FlvTagType::Audio, 0, Bytes::new());
        frame.timestamp = 0x0100_0001;
        frame.stream_id = 0x0100_0002;
        let bytes = frame.to_bytes();
        assert_eq!(&bytes[8..11], &[0x00, 0x00, 0x01]);
        assert_eq!(&bytes[12..15], &[0x00, 0x00, 0x02]);
    }

    #[test]
    fn test_tag_size() {
        let frame = FlvFrame::new(FlvTagType::Audio, 0, Bytes::from_static(&[0; 5]));
        assert_eq!(frame.tag_size(), 16);
        assert_eq!(frame.size(), 20);
    }
}
