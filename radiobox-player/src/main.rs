//! RadioBox player - main entry point
//!
//! Wires the playback controller to the audio pipeline, the SSE state
//! distribution, the unix-socket command listener and the OS mixer, then
//! runs until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radiobox_common::config::TomlConfig;
use radiobox_player::api::{self, SsePublisher};
use radiobox_player::audio::StreamPipeline;
use radiobox_player::command;
use radiobox_player::playback::{ControllerOptions, PlaybackController, Player, StatePublisher};
use radiobox_player::volume::ShellVolumeControl;
use tokio::sync::mpsc;

/// Command-line arguments for radiobox-player
#[derive(Parser, Debug)]
#[command(name = "radiobox-player")]
#[command(about = "Playback engine for the RadioBox internet-radio appliance")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "RADIOBOX_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = TomlConfig::resolve_path(args.config.as_deref());
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize tracing; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("radiobox_player={}", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting RadioBox player ({} channel(s) configured)",
        config.channels.len()
    );

    let publisher = Arc::new(SsePublisher::new());

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let pipeline = Arc::new(StreamPipeline::new(event_tx));

    let volume = Arc::new(ShellVolumeControl::new(&config.volume_control));

    let controller = PlaybackController::new(
        config.channels.clone(),
        Arc::clone(&pipeline) as Arc<dyn Player>,
        Arc::clone(&publisher) as Arc<dyn StatePublisher>,
        volume,
        ControllerOptions {
            reconnect_interval: Duration::from_secs(config.reconnect_interval_secs),
            ..ControllerOptions::default()
        },
    );
    controller.spawn_event_loop(event_rx);

    // Command listener on the unix socket
    let socket_path = config.socket_path.clone();
    let command_controller = Arc::clone(&controller);
    tokio::spawn(async move {
        if let Err(e) = command::serve(command_controller, &socket_path).await {
            tracing::error!("command listener failed: {}", e);
        }
    });

    // HTTP server for health and SSE state distribution
    let app = api::create_router(Arc::clone(&publisher));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down");
    controller.shutdown();
    pipeline.stop().await;
    info!("Shutdown complete");
    Ok(())
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
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
