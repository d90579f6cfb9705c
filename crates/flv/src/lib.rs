//! # FLV
//!
//! Framing-level FLV support: the 9-byte file header and raw tags with the
//! PreviousTagSize field that precedes them. Payloads are never demuxed;
//! this crate exists to move tags across a socket and rewrite their header
//! fields.
//!
//! ## License
//!
//! MIT License

pub mod error;
pub mod header;
pub mod parser_async;
pub mod tag;
pub mod test_utils;

pub use error::FlvError;
pub use header::{FLV_HEADER_SIZE, FlvHeader};
pub use parser_async::{FlvChunk, FlvFrameDecoder, FlvStreamReader};
pub use tag::{FlvFrame, FlvTagType};
