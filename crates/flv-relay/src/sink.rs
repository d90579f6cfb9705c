use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Destination of the stitched stream.
///
/// A single append-style writer: each call carries one complete unit
/// (the header, or one serialised frame) and calls are never interleaved.
#[async_trait]
pub trait OutputSink: Send {
    async fn write(&mut self, bytes: Bytes) -> io::Result<()>;
}

/// [`OutputSink`] over any tokio writer (file, stdout, socket, pipe).
///
/// Every write is flushed so downstream sees frames as soon as they are
/// published.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutputSink for WriterSink<W> {
    async fn write(&mut self, bytes: Bytes) -> io::Result<()> {
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await
    }
}
