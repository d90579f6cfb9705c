use std::{
    fmt::Display,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

pub const DEFAULT_PORT: u16 = 6666;

/// Runtime configuration for the [`Transmitter`](crate::Transmitter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address the encoder connects to
    pub bind_addr: SocketAddr,

    /// Silence after which the last frame is sent again
    pub backup_timeout: Duration,

    /// How often the keep-alive emitter checks for silence
    pub backup_interval: Duration,

    /// Added to the last forwarded timestamp when a new session starts (ms)
    pub reconnect_gap_ms: u32,

    /// Leading frames dropped from every session after the first
    pub skip_frames_on_reconnect: u32,

    /// Pause before accepting again after a failed accept
    pub accept_retry_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            backup_timeout: Duration::from_secs(4),
            backup_interval: Duration::from_secs(1),
            reconnect_gap_ms: 1000,
            skip_frames_on_reconnect: 2,
            accept_retry_delay: Duration::from_millis(100),
        }
    }
}

impl Display for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RelayConfig {{ bind_addr: {}, backup_timeout: {:.2}s, backup_interval: {:.2}s, reconnect_gap: {}ms, skip_frames: {} }}",
            self.bind_addr,
            self.backup_timeout.as_secs_f64(),
            self.backup_interval.as_secs_f64(),
            self.reconnect_gap_ms,
            self.skip_frames_on_reconnect
        )
    }
}

impl RelayConfig {
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// URL an encoder should push its FLV output to, e.g. as the
    /// `-f flv tcp://...` target of an ffmpeg invocation.
    pub fn ingest_url(&self) -> String {
        format!("tcp://127.0.0.1:{}", self.bind_addr.port())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.config.bind_addr = bind_addr;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.bind_addr.set_port(port);
        self
    }

    pub fn backup_timeout(mut self, backup_timeout: Duration) -> Self {
        self.config.backup_timeout = backup_timeout;
        self
    }

    pub fn backup_interval(mut self, backup_interval: Duration) -> Self {
        self.config.backup_interval = backup_interval;
        self
    }

    pub fn reconnect_gap_ms(mut self, reconnect_gap_ms: u32) -> Self {
        self.config.reconnect_gap_ms = reconnect_gap_ms;
        self
    }

    pub fn skip_frames_on_reconnect(mut self, skip_frames: u32) -> Self {
        self.config.skip_frames_on_reconnect = skip_frames;
        self
    }

    pub fn accept_retry_delay(mut self, delay: Duration) -> Self {
        self.config.accept_retry_delay = delay;
        self
    }

    pub fn build(self) -> RelayConfig {
        self.config
    }
}
