//! # salon-server
//!
//! Multi-channel chat relay.
//!
//! This binary provides:
//! - **WebSocket gateway** (`/ws`) speaking the JSON protocol in
//!   `salon_shared::protocol`
//! - **Chat service**: a single event loop owning channels, sessions and
//!   history, persisting every change before it is broadcast
//! - **REST API** (axum) for health, instance info, channel list, history
//!   and backup export
//! - **Static files** for the web client

mod api;
mod commands;
mod config;
mod error;
mod gateway;
mod persistence;
mod registry;
mod router;
mod service;
mod session;
mod transport;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use salon_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::persistence::Persistence;
use crate::service::{ChatService, InboundEvent};
use crate::transport::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,salon_server=debug")),
        )
        .init();

    info!("Starting Salon chat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open storage and load chat state
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database opened");

    let service = ChatService::new(Persistence::new(db), Hub::new(), config.max_message_len)?;

    // -----------------------------------------------------------------------
    // 4. Spawn the chat service
    // -----------------------------------------------------------------------
    let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity);
    let mut service_task = tokio::spawn(service.run(events_rx));

    let app_state = AppState {
        events: events_tx.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server until it fails, the service stops, or Ctrl+C
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        result = &mut service_task => {
            // The service only returns on its own after a persistence failure.
            let outcome = result?;
            if let Err(e) = outcome {
                error!(error = %e, "Chat service stopped");
                return Err(e.into());
            }
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    // Flush state before exiting.
    if events_tx.send(InboundEvent::Shutdown).await.is_ok() {
        service_task.await??;
    }

    Ok(())
}
