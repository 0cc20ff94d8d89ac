//! Meeple multiplayer host.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
mod room;
mod server;

use meeple_core::TileCatalog;
use room::MatchRoom;
use server::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse address from env or use default
    let addr: SocketAddr = std::env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    // An external tileset file overrides the built-in base game.
    let catalog = match std::env::var("MEEPLE_TILESET") {
        Ok(path) => {
            info!("Loading tileset from {}", path);
            let json = std::fs::read_to_string(&path)?;
            TileCatalog::from_json_str(&json)?
        }
        Err(_) => TileCatalog::base_game(),
    };

    info!("Starting Meeple host...");

    let state = Arc::new(ServerState::new(MatchRoom::new(catalog)));

    server::run_server(addr, state).await
}
