use std::sync::Arc;

use axum::{extract::State, http::Method, routing::get, Json, Router};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use salon_shared::ChannelSummary;
use salon_store::backup::BackupPayload;
use salon_store::MessageLog;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::gateway::ws_handler;
use crate::service::{InboundEvent, Query, ServiceStats};

#[derive(Clone)]
pub struct AppState {
    pub events: mpsc::Sender<InboundEvent>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/channels", get(list_channels))
        .route("/history", get(chat_history))
        .route("/backup", get(backup))
        .fallback_service(static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    max_message_len: usize,
    #[serde(flatten)]
    stats: ServiceStats,
}

/// Ask the chat service a question and wait for the answer.
async fn ask<R>(
    state: &AppState,
    build: impl FnOnce(oneshot::Sender<R>) -> Query,
) -> Result<R, ServerError> {
    let (tx, rx) = oneshot::channel();
    state
        .events
        .send(InboundEvent::Query(build(tx)))
        .await
        .map_err(|_| ServerError::ServiceUnavailable)?;
    rx.await.map_err(|_| ServerError::ServiceUnavailable)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Result<Json<ServerInfoResponse>, ServerError> {
    let stats = ask(&state, Query::Stats).await?;
    Ok(Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        max_message_len: state.config.max_message_len,
        stats,
    }))
}

async fn list_channels(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChannelSummary>>, ServerError> {
    Ok(Json(ask(&state, Query::Channels).await?))
}

async fn chat_history(State(state): State<AppState>) -> Result<Json<MessageLog>, ServerError> {
    Ok(Json(ask(&state, Query::History).await?))
}

async fn backup(State(state): State<AppState>) -> Result<Json<BackupPayload>, ServerError> {
    let payload = ask(&state, Query::Backup).await??;
    info!(
        messages = payload.chat_history.0.len(),
        channels = payload.channels.0.len(),
        "Backup exported"
    );
    Ok(Json(payload))
}

/// Start the HTTP + WebSocket server.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
