use crate::error::FlvError;
use crate::header::FLV_HEADER_SIZE;
use crate::tag::{FRAME_PREFIX_SIZE, FlvFrame, FlvTagType, PREV_TAG_SIZE_FIELD};
use bytes::{Buf, Bytes, BytesMut};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::trace;

const BUFFER_SIZE: usize = 4 * 1024; // 4 KB buffer size

/// One unit produced by [`FlvFrameDecoder`].
#[derive(Debug, Clone, PartialEq)]
pub enum FlvChunk {
    /// The raw 9 header bytes, not yet validated.
    Header(Bytes),
    Frame(FlvFrame),
}

/// Splits an FLV byte stream into its header and frames.
///
/// The header is handed out raw so the caller decides what an invalid
/// signature means. Each frame carries the PreviousTagSize field that
/// precedes its tag header.
#[derive(Debug, Default)]
pub struct FlvFrameDecoder {
    header_read: bool,
}

impl FlvFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes the next item needs in total, given what is buffered.
    fn needed(&self, src: &BytesMut) -> usize {
        if !self.header_read {
            FLV_HEADER_SIZE
        } else if src.len() < FRAME_PREFIX_SIZE {
            FRAME_PREFIX_SIZE
        } else {
            let data_size =
                ((src[5] as usize) << 16) | ((src[6] as usize) << 8) | (src[7] as usize);
            FRAME_PREFIX_SIZE + data_size
        }
    }
}

impl Decoder for FlvFrameDecoder {
    type Item = FlvChunk;
    type Error = FlvError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !self.header_read {
            if src.len() < FLV_HEADER_SIZE {
                src.reserve(FLV_HEADER_SIZE - src.len());
                return Ok(None);
            }
            self.header_read = true;
            return Ok(Some(FlvChunk::Header(src.split_to(FLV_HEADER_SIZE).freeze())));
        }

        if src.len() < FRAME_PREFIX_SIZE {
            src.reserve(FRAME_PREFIX_SIZE - src.len());
            return Ok(None);
        }

        let mut prefix = [0u8; FRAME_PREFIX_SIZE];
        prefix.copy_from_slice(&src[..FRAME_PREFIX_SIZE]);
        let mut frame = FlvFrame::parse_prefix(&prefix);

        if let FlvTagType::Unknown(tag_type) = frame.tag_type {
            return Err(FlvError::InvalidTagType(tag_type));
        }

        let total_needed = FRAME_PREFIX_SIZE + frame.data_size as usize;
        if src.len() < total_needed {
            src.reserve(total_needed - src.len());
            return Ok(None);
        }

        let mut raw = src.split_to(total_needed);
        raw.advance(FRAME_PREFIX_SIZE);
        frame.data = raw.freeze();

        trace!(
            tag_type = u8::from(frame.tag_type),
            data_size = frame.data_size,
            timestamp = frame.timestamp,
            "Decoded FLV frame"
        );
        Ok(Some(FlvChunk::Frame(frame)))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(buf)? {
            return Ok(Some(item));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        // A well-behaved muxer ends the stream with the last PreviousTagSize.
        if self.header_read && buf.len() == PREV_TAG_SIZE_FIELD {
            buf.clear();
            return Ok(None);
        }
        Err(FlvError::Truncated {
            needed: self.needed(buf),
            available: buf.len(),
        })
    }
}

/// Pull-style reader over an FLV byte stream.
///
/// Every termination is reported as a value: a clean end of stream is
/// [`FlvError::ConnectionClosed`], a stream cut mid-frame is
/// [`FlvError::Truncated`].
pub struct FlvStreamReader<R> {
    framed: FramedRead<R, FlvFrameDecoder>,
}

impl<R: AsyncRead + Unpin> FlvStreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, BUFFER_SIZE)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            framed: FramedRead::with_capacity(reader, FlvFrameDecoder::new(), capacity),
        }
    }

    /// Reads exactly the 9 header bytes. Must be called first.
    pub async fn read_header(&mut self) -> Result<Bytes, FlvError> {
        match self.framed.next().await {
            Some(Ok(FlvChunk::Header(bytes))) => Ok(bytes),
            Some(Ok(FlvChunk::Frame(_))) => Err(FlvError::InvalidHeader),
            Some(Err(e)) => Err(e),
            None => Err(FlvError::ConnectionClosed),
        }
    }

    /// Reads the next frame.
    pub async fn read_frame(&mut self) -> Result<FlvFrame, FlvError> {
        match self.framed.next().await {
            Some(Ok(FlvChunk::Frame(frame))) => Ok(frame),
            Some(Ok(FlvChunk::Header(_))) => Err(FlvError::UnexpectedHeader),
            Some(Err(e)) => Err(e),
            None => Err(FlvError::ConnectionClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FlvHeader;
    use crate::test_utils::{audio_frame, encode_stream, script_frame, video_frame};

    #[test]
    fn test_decoder_yields_header_then_frames() {
        let data = vec![
            0x46, 0x4C, 0x56, // "FLV" signature
            0x01, // version
            0x05, // flags (audio and video)
            0x00, 0x00, 0x00, 0x09, // data offset (9 bytes)
            0x00, 0x00, 0x00, 0x00, // PreviousTagSize0
            // FLV tag header (11 bytes)
            0x09, // tag type (video)
            0x00, 0x00, 0x02, // data size (2 bytes)
            0x00, 0x00, 0x28, // timestamp (40 ms)
            0x00, // timestamp extended
            0x00, 0x00, 0x00, // stream ID
            0x17, 0x01, // payload
        ];

        let mut decoder = FlvFrameDecoder::new();
        let mut buffer = BytesMut::from(data.as_slice());

        match decoder.decode(&mut buffer).unwrap() {
            Some(FlvChunk::Header(header)) => assert!(FlvHeader::validate(&header)),
            other => panic!("Expected FLV header, got {other:?}"),
        }
        match decoder.decode(&mut buffer).unwrap() {
            Some(FlvChunk::Frame(frame)) => {
                assert!(frame.is_video_tag());
                assert_eq!(frame.timestamp, 40);
                assert_eq!(frame.data, Bytes::from_static(&[0x17, 0x01]));
            }
            other => panic!("Expected frame, got {other:?}"),
        }
        assert!(buffer.is_empty());
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_decoder_waits_for_full_payload() {
        let bytes = encode_stream(&[video_frame(0, true)]);
        let mut decoder = FlvFrameDecoder::new();

        let mut buffer = BytesMut::from(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            decoder.decode(&mut buffer).unwrap(),
            Some(FlvChunk::Header(_))
        ));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(&bytes[bytes.len() - 1..]);
        assert!(matches!(
            decoder.decode(&mut buffer).unwrap(),
            Some(FlvChunk::Frame(_))
        ));
    }

    #[test]
    fn test_decoder_rejects_unknown_tag_type() {
        let mut data = FlvHeader::new(true, true).to_bytes().to_vec();
        data.extend_from_slice(&[0, 0, 0, 0, 0x03, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        let mut decoder = FlvFrameDecoder::new();
        let mut buffer = BytesMut::from(data.as_slice());
        decoder.decode(&mut buffer).unwrap();
        assert!(matches!(
            decoder.decode(&mut buffer),
            Err(FlvError::InvalidTagType(3))
        ));
    }

    #[tokio::test]
    async fn test_reader_reads_until_closed() {
        let bytes = encode_stream(&[script_frame(0), video_frame(40, true), audio_frame(41)]);
        let mut reader = FlvStreamReader::new(&bytes[..]);

        let header = reader.read_header().await.unwrap();
        assert_eq!(header.len(), FLV_HEADER_SIZE);

        let first = reader.read_frame().await.unwrap();
        assert!(first.is_script_tag());
        assert_eq!(first.previous_tag_size, 0);

        let second = reader.read_frame().await.unwrap();
        assert_eq!(second.previous_tag_size, first.tag_size());
        let third = reader.read_frame().await.unwrap();
        assert!(third.is_audio_tag());
        assert_eq!(third.timestamp, 41);

        // encode_stream ends with the trailing PreviousTagSize
        assert!(matches!(
            reader.read_frame().await,
            Err(FlvError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_reader_reports_truncated_frame() {
        let bytes = encode_stream(&[video_frame(0, true)]);
        // drop the trailing PreviousTagSize and the last payload byte
        let cut = &bytes[..bytes.len() - 5];
        let mut reader = FlvStreamReader::new(cut);

        reader.read_header().await.unwrap();
        let err = reader.read_frame().await.unwrap_err();
        assert!(matches!(err, FlvError::Truncated { .. }));
        assert!(err.is_connection_ended());
    }

    #[tokio::test]
    async fn test_reader_short_header_is_connection_end() {
        let mut reader = FlvStreamReader::new(&b"FLV\x01"[..]);
        let err = reader.read_header().await.unwrap_err();
        assert!(matches!(
            err,
            FlvError::Truncated {
                needed: 9,
                available: 4
            }
        ));
    }

    #[tokio::test]
    async fn test_reader_empty_stream_is_closed() {
        let mut reader = FlvStreamReader::new(&b""[..]);
        assert!(matches!(
            reader.read_header().await,
            Err(FlvError::ConnectionClosed)
        ));
    }
}
