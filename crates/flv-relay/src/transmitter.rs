//! # Transmitter
//!
//! TCP server the encoder pushes FLV into. Connections are served strictly
//! one after another; each one is a session, and the reconnect bookkeeping
//! between sessions stitches them into one continuous output stream:
//!
//! 1. The first valid FLV header of the process is forwarded, later ones
//!    are swallowed.
//! 2. Every frame goes through the drop policy of [`SessionState`], the
//!    rest is renumbered and written by the [`FramePublisher`].
//! 3. When a session ends for any reason other than shutdown, the next one
//!    starts 1000ms after the last forwarded timestamp, with a new ordinal,
//!    and drops its first two eligible frames.
//!
//! A [`BackupEmitter`] runs next to the accept loop for the whole lifetime
//! of [`BoundTransmitter::run`]; both share one [`FramePublisher`] over the
//! output sink.

use std::net::SocketAddr;
use std::sync::Arc;

use flv::{FlvError, FlvHeader, FlvStreamReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backup::BackupEmitter;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::publisher::FramePublisher;
use crate::session::{FrameDecision, SessionEnd, SessionState, SessionSummary};
use crate::sink::OutputSink;

/// The relay before its listener is bound.
pub struct Transmitter {
    config: RelayConfig,
    shutdown: CancellationToken,
}

impl Transmitter {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Uses `shutdown` instead of a private token, so the relay stops with
    /// the rest of the application.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Binds the listener. Failing here is fatal for the relay.
    pub async fn bind(self) -> Result<BoundTransmitter, RelayError> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;
        info!(addr = %listener.local_addr()?, "Transmitter initialized");

        Ok(BoundTransmitter {
            config: self.config,
            shutdown: self.shutdown,
            listener,
        })
    }
}

/// A relay with a bound listener, ready to [`run`](Self::run).
///
/// The output sink is only handed over in `run`, so nothing is opened or
/// truncated before the port is known to be ours.
pub struct BoundTransmitter {
    config: RelayConfig,
    shutdown: CancellationToken,
    listener: TcpListener,
}

impl BoundTransmitter {
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serves encoder sessions into `sink` until the shutdown token is
    /// cancelled.
    pub async fn run<S: OutputSink + 'static>(self, sink: S) -> Result<(), RelayError> {
        let publisher = Arc::new(FramePublisher::new(sink));
        let backup = tokio::spawn(
            BackupEmitter::new(
                publisher.clone(),
                self.config.backup_timeout,
                self.config.backup_interval,
                self.shutdown.clone(),
            )
            .run(),
        );

        let mut state = SessionState::new();
        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (socket, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "Failed to accept connection");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.accept_retry_delay) => continue,
                    }
                }
            };

            info!(%peer, stream_num = state.stream_num, "Encoder connected");
            let summary = self.run_session(&publisher, socket, &mut state).await;
            log_session_end(&summary);

            if matches!(summary.end, SessionEnd::Shutdown) {
                break;
            }

            state.begin_next_session(
                self.config.reconnect_gap_ms,
                self.config.skip_frames_on_reconnect,
            );
            info!(
                stream_num = state.stream_num,
                preserved_ts = state.preserved_ts,
                "Next stream started"
            );
        }

        self.shutdown.cancel();
        backup
            .await
            .map_err(|e| RelayError::TaskJoin(e.to_string()))?;

        let stats = publisher.stats().await;
        info!(
            frames = stats.frames_published,
            backups = stats.backups_sent,
            bytes = stats.bytes_written,
            "Transmitter stopped"
        );
        Ok(())
    }

    async fn run_session<S: OutputSink>(
        &self,
        publisher: &FramePublisher<S>,
        socket: TcpStream,
        state: &mut SessionState,
    ) -> SessionSummary {
        let summary = SessionSummary::new(state.stream_num);
        let mut reader = FlvStreamReader::new(socket);

        let header = tokio::select! {
            _ = self.shutdown.cancelled() => return summary.finish(SessionEnd::Shutdown),
            header = reader.read_header() => header,
        };
        let header = match header {
            Ok(header) => header,
            Err(FlvError::ConnectionClosed) => return summary.finish(SessionEnd::Closed),
            Err(e) => return summary.finish(SessionEnd::Read(e)),
        };
        if !FlvHeader::validate(&header) {
            return summary.finish(SessionEnd::Handshake);
        }
        if let Err(e) = publisher.write_header(header).await {
            return summary.finish(SessionEnd::Sink(e));
        }

        self.forward_frames(publisher, &mut reader, state, summary)
            .await
    }

    async fn forward_frames<S: OutputSink>(
        &self,
        publisher: &FramePublisher<S>,
        reader: &mut FlvStreamReader<TcpStream>,
        state: &mut SessionState,
        mut summary: SessionSummary,
    ) -> SessionSummary {
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => return summary.finish(SessionEnd::Shutdown),
                frame = reader.read_frame() => frame,
            };
            let frame = match frame {
                Ok(frame) => frame,
                Err(FlvError::ConnectionClosed) => return summary.finish(SessionEnd::Closed),
                Err(e) => return summary.finish(SessionEnd::Read(e)),
            };

            match state.decide(&frame) {
                FrameDecision::Forward => {
                    let is_metadata = frame.is_script_tag();
                    match publisher
                        .publish(frame, state.preserved_ts, state.stream_num)
                        .await
                    {
                        Ok(timestamp) => {
                            state.record_forwarded(timestamp, is_metadata);
                            summary.forwarded += 1;
                        }
                        Err(e) => return summary.finish(SessionEnd::Sink(e)),
                    }
                }
                FrameDecision::DropMetadata => {
                    debug!(timestamp = frame.timestamp, "Skip metadata frame");
                    summary.dropped_metadata += 1;
                }
                FrameDecision::DropLeading => {
                    debug!(
                        tag_type = u8::from(frame.tag_type),
                        remaining = state.skip_frames,
                        "Skip leading frame"
                    );
                    summary.dropped_leading += 1;
                }
            }
        }
    }
}

fn log_session_end(summary: &SessionSummary) {
    let SessionSummary {
        stream_num,
        forwarded,
        dropped_metadata,
        dropped_leading,
        end,
    } = summary;

    match end {
        SessionEnd::Sink(e) => error!(
            stream_num,
            forwarded,
            error = %e,
            "Session ended, output sink failed"
        ),
        SessionEnd::Handshake => info!(stream_num, "Not flv! Session aborted"),
        SessionEnd::Read(e) if !e.is_connection_ended() => info!(
            stream_num,
            forwarded,
            error = %e,
            "Session ended on malformed data"
        ),
        _ => info!(
            stream_num,
            forwarded,
            dropped_metadata,
            dropped_leading,
            reason = %end,
            "Session ended"
        ),
    }
}
