//! ecmwatch - serve live Buell ECM telemetry to a browser dashboard
//!
//! Loads the configuration, builds the field map and runs the HTTP/WebSocket
//! server until Ctrl+C or SIGTERM.

use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ecmwatch::server::shutdown_signal;
use ecmwatch::{CliOverrides, Config, EcmError, Server};

#[derive(Parser, Debug)]
#[command(name = "ecmwatch", version, about = "Stream Buell ECM telemetry to a web dashboard")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "ECMWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: CliOverrides,
}

fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Log what went wrong at startup and how to fix it, then hand the error on.
fn startup_failure(context: &'static str, err: EcmError) -> anyhow::Error {
    if err.is_fatal_at_startup() {
        error!("{}: {}", context, err);
        for suggestion in err.recovery_suggestions() {
            error!("  - {}", suggestion);
        }
    }
    anyhow::Error::new(err).context(context)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(cli.config.as_deref(), cli.overrides);

    init_tracing(loaded.as_ref().ok().and_then(|c| c.log_level.as_deref()));
    info!("ecmwatch v{}", env!("CARGO_PKG_VERSION"));
    let config = loaded.map_err(|e| startup_failure("invalid configuration", e))?;

    let map = config.field_map.load().map_err(|e| startup_failure("failed to build the field map", e))?;

    let shutdown = CancellationToken::new();
    let server = Server::bind(&config, map, shutdown.clone())
        .await
        .map_err(|e| startup_failure("failed to start the server", e))?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, closing streams");
        signal_token.cancel();
    });

    server.run().await?;
    Ok(())
}
