use clap::Parser;
use flv_relay::{Transmitter, WriterSink};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod error;

use cli::{CliArgs, OutputTarget};
use error::AppError;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    // stdout may carry the video, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_directive()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let config = args.relay_config()?;
    info!("{config}");
    info!("Encoder ingest URL: {}", config.ingest_url());

    let shutdown = CancellationToken::new();
    spawn_ctrl_c_handler(shutdown.clone());

    let output = args.output_target()?;
    // bind before touching the output, so a taken port leaves it intact
    let relay = Transmitter::new(config).with_shutdown(shutdown).bind().await?;

    match output {
        OutputTarget::Stdout => {
            info!("Writing relayed stream to stdout");
            relay.run(WriterSink::new(tokio::io::stdout())).await?;
        }
        OutputTarget::File(path) => {
            let file = tokio::fs::File::create(&path).await?;
            info!(path = %path.display(), "Writing relayed stream to file");
            relay.run(WriterSink::new(file)).await?;
        }
    }

    info!("Relay finished");
    Ok(())
}

fn spawn_ctrl_c_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Received Ctrl+C, shutting down");
        shutdown.cancel();
    });
}
