use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use flv_relay::RelayConfig;

use crate::error::AppError;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "FLV relay for restart-prone encoders",
    long_about = "Accepts FLV pushed over TCP by an encoder and relays it as one continuous\n\
                  stream. When the encoder reconnects, timestamps continue where the previous\n\
                  connection stopped, duplicate headers and metadata are dropped, and the last\n\
                  frame is repeated while the input is silent."
)]
pub struct CliArgs {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0", help = "Address the encoder connects to")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = flv_relay::config::DEFAULT_PORT)]
    pub port: u16,

    /// Output destination, `-` for stdout
    #[arg(
        short,
        long,
        default_value = "-",
        help = "File the relayed stream is written to, or '-' for stdout"
    )]
    pub output: String,

    /// Seconds of silence before the last frame is repeated
    #[arg(long, default_value_t = 4)]
    pub backup_timeout: u64,

    /// Seconds between keep-alive checks
    #[arg(long, default_value_t = 1)]
    pub backup_interval: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Where the relayed bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl CliArgs {
    pub fn output_target(&self) -> Result<OutputTarget, AppError> {
        match self.output.trim() {
            "" => Err(AppError::InvalidInput("empty output path".to_string())),
            "-" => Ok(OutputTarget::Stdout),
            path => Ok(OutputTarget::File(PathBuf::from(path))),
        }
    }

    pub fn relay_config(&self) -> Result<RelayConfig, AppError> {
        if self.backup_interval == 0 {
            return Err(AppError::InvalidInput(
                "backup interval must be at least one second".to_string(),
            ));
        }

        Ok(RelayConfig::builder()
            .bind_addr(SocketAddr::new(self.host, self.port))
            .backup_timeout(Duration::from_secs(self.backup_timeout))
            .backup_interval(Duration::from_secs(self.backup_interval))
            .build())
    }

    /// Default filter directive when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["flvrelay"]).unwrap();
        assert_eq!(args.output_target().unwrap(), OutputTarget::Stdout);
        assert_eq!(args.log_directive(), "info");

        let config = args.relay_config().unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.ingest_url(), "tcp://127.0.0.1:6666");
    }

    #[test]
    fn test_flags() {
        let args = CliArgs::try_parse_from([
            "flvrelay",
            "--host",
            "127.0.0.1",
            "-p",
            "7000",
            "-o",
            "live.flv",
            "--backup-timeout",
            "10",
            "-vv",
        ])
        .unwrap();

        assert_eq!(
            args.output_target().unwrap(),
            OutputTarget::File(PathBuf::from("live.flv"))
        );
        assert_eq!(args.log_directive(), "trace");

        let config = args.relay_config().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.backup_timeout, Duration::from_secs(10));
        assert_eq!(config.backup_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let args = CliArgs::try_parse_from(["flvrelay", "--backup-interval", "0"]).unwrap();
        assert!(matches!(
            args.relay_config(),
            Err(AppError::InvalidInput(_))
        ));
    }
}
