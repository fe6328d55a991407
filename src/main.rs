use std::path::PathBuf;
use std::time::Duration;

use audio_bridge::capability::Capabilities;
use audio_bridge::config::{self, JsonFileStore, ServerConfig};
use audio_bridge::{Router, Server};
use clap::Parser;
use tracing::info;

/// Local JSON control API for volume, media playback and audio devices.
#[derive(Debug, Parser)]
#[command(name = "audio-bridge", version, about)]
struct Args {
    /// Settings file holding the persisted API port.
    #[arg(long, env = "AUDIO_BRIDGE_CONFIG", default_value = "audio-bridge.json")]
    config: PathBuf,

    /// Address to bind.
    #[arg(long, env = "AUDIO_BRIDGE_HOST", default_value = config::DEFAULT_HOST)]
    host: String,

    /// Seconds a connection may stay silent before it is dropped (0 disables).
    #[arg(long, default_value_t = config::DEFAULT_IDLE_TIMEOUT.as_secs())]
    idle_timeout: u64,

    /// Validate and store a new API port, then exit. Applies on next start.
    #[arg(long, value_name = "PORT", allow_negative_numbers = true)]
    set_port: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let store = JsonFileStore::new(&args.config);

    if let Some(port) = args.set_port {
        let port = config::set_port(&store, port)?;
        info!(port, config = %store.path().display(), "API port saved, restart to apply");
        return Ok(());
    }

    let config = ServerConfig {
        host: args.host,
        idle_timeout: (args.idle_timeout > 0).then(|| Duration::from_secs(args.idle_timeout)),
        ..ServerConfig::load(&store)?
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %store.path().display(),
        "starting audio bridge with simulated audio backends"
    );

    let server = Server::from_config(&config).await?;
    let router = Router::new(Capabilities::in_memory());

    tokio::select! {
        res = server.run(router) => res?,
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
    }

    Ok(())
}
