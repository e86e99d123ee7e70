//! Tawk audio player (tawk-ap) - Main entry point
//!
//! Runs the playback orchestrator over the clock-driven backend and exposes
//! it over HTTP/SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tawk_ap::config::{load_feed, TomlConfig};
use tawk_ap::playback::{PlaybackEngine, SimulatedBackend};
use tawk_common::events::SourceContextType;
use tawk_common::PlayableSource;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tawk-ap
#[derive(Parser, Debug)]
#[command(name = "tawk-ap")]
#[command(about = "Global audio playback orchestrator for tawks")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "TAWK_AP_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "TAWK_AP_PORT")]
    port: Option<u16>,

    /// JSON feed of sources loaded at startup
    #[arg(short, long, env = "TAWK_AP_FEED")]
    feed: Option<PathBuf>,

    /// Continue into the feed when the queue runs out
    #[arg(long)]
    autoplay: bool,

    /// Drop replies when enqueueing
    #[arg(long)]
    no_replies: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let mut config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(args.port, args.feed.clone(), args.autoplay, args.no_replies);

    // Initialize tracing
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tawk_ap={level},tawk_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tawk audio player on port {}", config.port);

    let feed = match &config.feed_path {
        Some(path) => load_feed(path).context("Failed to load feed")?,
        None => Vec::new(),
    };

    let backend = Arc::new(SimulatedBackend::new(
        config.status_interval(),
        config.simulation.default_duration_secs,
    ));
    register_durations(&backend, &feed, config.simulation.jingle_duration_secs);

    let engine = Arc::new(PlaybackEngine::new(backend, config.engine_settings()));
    if !feed.is_empty() {
        engine
            .set_feed(feed, SourceContextType::Feed, None)
            .await
            .context("Failed to install feed")?;
    }
    engine.start();
    info!("Playback engine initialized");

    let ip = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address))?;
    let addr = SocketAddr::new(ip, config.port);

    tawk_ap::api::run(addr, Arc::clone(&engine), shutdown_signal())
        .await
        .context("Server error")?;

    engine.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Clip lengths the simulated backend should report for the feed
fn register_durations(backend: &SimulatedBackend, feed: &[PlayableSource], jingle_secs: f64) {
    for source in feed {
        if source.duration > 0.0 {
            backend.set_duration(source.audio_url.clone(), source.duration);
        }
        if let Some(url) = source.resolve_intro_url() {
            backend.set_duration(url, jingle_secs);
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
