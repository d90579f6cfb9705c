//! Keep-alive emitter.
//!
//! While an encoder restarts, downstream would see no data and might time
//! out. The emitter re-sends the last published frame whenever the output
//! has been silent for `timeout`; consumers must tolerate the duplicate.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::publisher::FramePublisher;
use crate::sink::OutputSink;

pub struct BackupEmitter<S> {
    publisher: Arc<FramePublisher<S>>,
    timeout: Duration,
    interval: Duration,
    shutdown: CancellationToken,
}

impl<S: OutputSink> BackupEmitter<S> {
    pub fn new(
        publisher: Arc<FramePublisher<S>>,
        timeout: Duration,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            publisher,
            timeout,
            interval,
            shutdown,
        }
    }

    /// Ticks every `interval` until the shutdown token is cancelled.
    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.publisher.republish_if_stale(self.timeout).await {
                Ok(Some(timestamp)) => warn!(timestamp, "Backup frame sent"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Failed to send backup frame"),
            }
        }
        debug!("Backup emitter stopped");
    }
}
