//! WebSocket gateway: one task per connection.
//!
//! The task forwards decoded client frames into the chat service and drains
//! the session's outbound queue into the socket. It holds no chat state.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use salon_shared::protocol::{ClientEvent, ServerEvent};
use salon_shared::SessionId;

use crate::api::AppState;
use crate::service::InboundEvent;

/// Largest accepted frame: room for the message limit plus JSON escaping.
fn max_frame_size(max_message_len: usize) -> usize {
    max_message_len.saturating_mul(4).saturating_add(1024)
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let limit = max_frame_size(state.config.max_message_len);
    ws.max_message_size(limit)
        .on_upgrade(move |socket| handle_socket(socket, state.events))
}

/// Map a decoded client frame onto the service's inbound event.
pub fn to_inbound(session: SessionId, event: ClientEvent) -> InboundEvent {
    match event {
        ClientEvent::Register { display_name } => InboundEvent::Register {
            session,
            display_name,
        },
        ClientEvent::Message { text } => InboundEvent::Message { session, text },
        ClientEvent::Command { line } => InboundEvent::Command { session, line },
    }
}

async fn handle_socket(socket: WebSocket, events: mpsc::Sender<InboundEvent>) {
    let session = SessionId::new();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    if events
        .send(InboundEvent::Connect {
            session,
            outbound: outbound_tx,
        })
        .await
        .is_err()
    {
        warn!(session = %session, "Chat service is gone, refusing connection");
        return;
    }
    info!(session = %session, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    warn!(session = %session, error = %e, "Failed to encode server event");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let inbound = events.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            let text = match frame {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!(session = %session, error = %e, "WebSocket read failed");
                    break;
                }
            };

            let event = match ClientEvent::from_json(&text) {
                Ok(event) => event,
                Err(e) => {
                    debug!(session = %session, error = %e, "Dropping malformed frame");
                    continue;
                }
            };

            if inbound.send(to_inbound(session, event)).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let _ = events.send(InboundEvent::Disconnect { session }).await;
    info!(session = %session, "WebSocket disconnected");
}
