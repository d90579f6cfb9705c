use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced by the relay.
///
/// Only [`RelayError::Bind`] and [`RelayError::TaskJoin`] reach the caller
/// of the relay. Everything else ends a session or a single keep-alive
/// attempt and is logged where it happens.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Output sink write failed: {0}")]
    Sink(#[source] io::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(String),
}
