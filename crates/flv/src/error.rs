use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlvError {
    #[error("Invalid FLV header")]
    InvalidHeader,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The peer closed the connection on a frame boundary.
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Truncated data: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("Invalid tag type encountered: {0}")]
    InvalidTagType(u8),
    #[error("FLV header received where a tag was expected")]
    UnexpectedHeader,
}

impl FlvError {
    /// Returns true when the error means the upstream connection is gone
    /// (closed, reset, or cut mid-frame) rather than sending garbage.
    pub fn is_connection_ended(&self) -> bool {
        match self {
            FlvError::ConnectionClosed | FlvError::Truncated { .. } => true,
            FlvError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
