use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::{BufMut, Bytes, BytesMut};

pub const FLV_HEADER_SIZE: usize = 9;

/// 'FLV' as a big-endian 24-bit value
const FLV_SIGNATURE: u32 = 0x464C56;

const FLAG_AUDIO: u8 = 0b0000_0100;
const FLAG_VIDEO: u8 = 0b0000_0001;

/// The 9-byte FLV file header.
#[derive(Debug, Clone, PartialEq)]
pub struct FlvHeader {
    pub signature: u32, // 3 bytes, always 'FLV'
    pub version: u8,
    pub has_audio: bool,
    pub has_video: bool,
    pub data_offset: u32, // always 9 for version 1
}

impl FlvHeader {
    /// Creates a version 1 header with the given stream flags.
    pub fn new(has_audio: bool, has_video: bool) -> Self {
        Self {
            signature: FLV_SIGNATURE,
            version: 1,
            has_audio,
            has_video,
            data_offset: FLV_HEADER_SIZE as u32,
        }
    }

    /// Parses the header and advances `reader` past it.
    ///
    /// Fails with `InvalidData` on a wrong signature (the reader is rewound)
    /// or data offset, and with `UnexpectedEof` on a short buffer.
    pub fn parse(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let start = reader.position();

        let signature = reader.read_u24::<BigEndian>()?;
        if signature != FLV_SIGNATURE {
            reader.set_position(start);
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid FLV signature",
            ));
        }

        let version = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let data_offset = reader.read_u32::<BigEndian>()?;
        if data_offset as usize != FLV_HEADER_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid FLV header size: {data_offset}"),
            ));
        }

        Ok(FlvHeader {
            signature,
            version,
            has_audio: flags & FLAG_AUDIO != 0,
            has_video: flags & FLAG_VIDEO != 0,
            data_offset,
        })
    }

    /// Checks whether `bytes` begin with a well-formed FLV header.
    ///
    /// Never fails; a short or malformed buffer simply yields `false`.
    pub fn validate(bytes: &[u8]) -> bool {
        if bytes.len() < FLV_HEADER_SIZE {
            return false;
        }
        let mut cursor = io::Cursor::new(Bytes::copy_from_slice(&bytes[..FLV_HEADER_SIZE]));
        Self::parse(&mut cursor).is_ok()
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FLV_HEADER_SIZE);
        buf.put_uint(self.signature as u64, 3);
        buf.put_u8(self.version);
        let mut flags = 0u8;
        if self.has_audio {
            flags |= FLAG_AUDIO;
        }
        if self.has_video {
            flags |= FLAG_VIDEO;
        }
        buf.put_u8(flags);
        buf.put_u32(self.data_offset);
        buf.freeze()
    }
}
