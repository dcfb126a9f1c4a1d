//! Play Director (mixdeck-pd) - Main entry point
//!
//! Hosts the playback state machine behind an HTTP/SSE control surface.
//! This binary wires the in-process simulated players and the in-memory
//! session store; embedders substitute real renderer bridges and a shared
//! store through the library API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mixdeck_pd::api::{self, AppState};
use mixdeck_pd::config::DirectorConfig;
use mixdeck_pd::director::Director;
use mixdeck_pd::player::simulated::SimulatedPlayer;
use mixdeck_pd::player::PlayerPair;
use mixdeck_pd::search::SearchClient;
use mixdeck_pd::sync::MemoryStore;

/// Command-line arguments for mixdeck-pd
#[derive(Parser, Debug)]
#[command(name = "mixdeck-pd")]
#[command(about = "Play Director service for mixdeck")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5850", env = "MIXDECK_PD_PORT")]
    port: u16,

    /// Path to a TOML config file
    #[arg(short, long, env = "MIXDECK_PD_CONFIG")]
    config: Option<PathBuf>,

    /// API key for the video search provider
    #[arg(long, env = "MIXDECK_SEARCH_API_KEY")]
    search_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mixdeck_pd=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DirectorConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => DirectorConfig::default(),
    };
    config.validate().context("invalid configuration")?;

    info!(
        device = %config.device_id,
        authority = config.is_playback_device,
        "starting mixdeck Play Director on port {}",
        args.port
    );

    let (player_a, rx_a, _ctl_a) = SimulatedPlayer::new("A");
    let (player_b, rx_b, _ctl_b) = SimulatedPlayer::new("B");
    let players = PlayerPair::new(Box::new(player_a), Box::new(player_b));
    let store = Arc::new(MemoryStore::default());

    let director = Director::spawn(config, players, rx_a, rx_b, store);

    let search = args
        .search_api_key
        .filter(|key| !key.is_empty())
        .map(|key| Arc::new(SearchClient::new(key)));
    if search.is_none() {
        info!("search API key not set, /search is disabled");
    }

    let state = AppState {
        director: director.clone(),
        search,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    api::serve(&addr.to_string(), state, shutdown_signal())
        .await
        .context("server error")?;

    director.shutdown();
    info!("server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("received terminate signal, shutting down");
        }
    }
}
