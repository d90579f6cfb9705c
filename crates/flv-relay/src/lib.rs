//! # FLV Relay
//!
//! Turns the output of a restart-prone encoder into one continuous FLV
//! stream. The encoder pushes FLV over TCP; every time it reconnects the
//! relay hides the restart from the consumer: one header, one metadata tag,
//! a monotonic timeline, and keep-alive copies of the last frame while the
//! encoder is away.
//!
//! ## Components
//!
//! - [`Transmitter`]: accept loop and reconnect bookkeeping
//! - [`FramePublisher`]: atomic renumber + write + record of each frame
//! - [`BackupEmitter`]: keep-alive re-publisher
//! - [`OutputSink`]: where the stitched stream goes
//!
//! ## License
//!
//! MIT License

pub mod backup;
pub mod config;
pub mod error;
pub mod publisher;
pub mod renumber;
pub mod session;
pub mod sink;
pub mod transmitter;

pub use backup::BackupEmitter;
pub use config::{RelayConfig, RelayConfigBuilder};
pub use error::RelayError;
pub use publisher::{FramePublisher, LastFrameState, PublisherStats};
pub use renumber::{Renumbered, renumber};
pub use session::{FrameDecision, SessionEnd, SessionState, SessionSummary};
pub use sink::{OutputSink, WriterSink};
pub use transmitter::{BoundTransmitter, Transmitter};
