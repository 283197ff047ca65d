//! Voxel Game Server
//!
//! Runs the server environment: scripted entities, dropped items and player
//! avatars stepped on a fixed tick.

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, trace};
use tracing_subscriber::{fmt, EnvFilter};

use voxel_server::config::ServerConfig;
use voxel_server::game::item::ItemDefManager;
use voxel_server::game::map::{NodeKind, VoxelMap};
use voxel_server::game::math::V3s16;
use voxel_server::game::player::PlayerManager;
use voxel_server::object::ActiveObjectMessage;
use voxel_server::script::EntityRegistry;
use voxel_server::{ServerEnvironment, WorldSettings, VERSION};

/// Half width of the starting floor in nodes
const FLOOR_RADIUS: i16 = 32;

/// Depth of the outgoing message queue in ticks
const OUTGOING_QUEUE_DEPTH: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    info!("Voxel Server v{}", VERSION);

    let config = ServerConfig::load().await?;
    info!(
        "Configuration loaded from: {}",
        config.config_path.display()
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Vec<ActiveObjectMessage>>(OUTGOING_QUEUE_DEPTH);

    let mut map = VoxelMap::new();
    map.fill(
        V3s16::new(-FLOOR_RADIUS, -1, -FLOOR_RADIUS),
        V3s16::new(FLOOR_RADIUS, -1, FLOOR_RADIUS),
        NodeKind::Solid,
    );

    let mut env = ServerEnvironment::new(
        WorldSettings::from(&config),
        Box::new(EntityRegistry::with_builtin()),
        Box::new(map),
        Arc::new(ItemDefManager::with_basic_items()),
        PlayerManager::new(config.max_players as usize),
    );
    let activated = env.activate_static_objects();
    info!(activated = activated, "Environment initialized");

    // Drain object messages; a transport would deliver them to clients
    let sender_handle = tokio::spawn(async move {
        while let Some(messages) = outgoing_rx.recv().await {
            trace!(count = messages.len(), "Outgoing object messages");
        }
    });

    let mut world_shutdown_rx = shutdown_tx.subscribe();
    let world_handle = tokio::spawn(async move {
        env.run(&mut world_shutdown_rx, outgoing_tx).await;
    });

    info!("Server startup complete!");

    wait_for_shutdown(shutdown_tx.clone()).await;

    info!("Shutting down server...");
    let _ = world_handle.await;
    let _ = sender_handle.await;

    info!("Server shutdown complete. Goodbye!");
    Ok(())
}

/// Initialize the logging/tracing system
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,voxel_server=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    let _ = shutdown_tx.send(());
}
