use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{
    connection::ClientConnection,
    msg::ClientEvent,
    session::{ChatService, ChatSession, SessionEvent},
};
use crate::config::Config;

#[debug_handler(state = crate::AppState)]
pub async fn room_ws(
    State(chat): State<Arc<ChatService>>,
    State(config): State<Arc<Config>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| serve_socket(stream, chat, config.outbox_capacity))
}

/// Runs one socket: a writer task draining the outbox, a session actor
/// processing events, and this task reading frames into the actor's queue.
pub(crate) async fn serve_socket(stream: WebSocket, chat: Arc<ChatService>, outbox_capacity: usize) {
    let (conn, mut outbox) = ClientConnection::channel(outbox_capacity);
    let conn_id = conn.id;
    info!(conn_id = %conn_id, "socket connected");

    let (mut sink, mut frames) = stream.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if sink.send(WsMessage::text(frame.to_string())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let (inbound_tx, inbound_rx) = mpsc::channel(outbox_capacity);
    let session = tokio::spawn(ChatSession::new(chat, conn).run(inbound_rx));

    while let Some(Ok(frame)) = frames.next().await {
        let event = match frame {
            WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => SessionEvent::Client(event),
                Err(e) => SessionEvent::Malformed(e.to_string()),
            },
            WsMessage::Close(_) => break,
            _ => continue,
        };
        if inbound_tx.send(event).await.is_err() {
            break;
        }
    }

    // Queued events still run; the actor stops after the disconnect.
    let _ = inbound_tx.send(SessionEvent::Disconnect).await;
    drop(inbound_tx);
    if let Err(e) = session.await {
        debug!(conn_id = %conn_id, error = %e, "session task ended abnormally");
    }
    // The outbox closes once the last handle to the connection is gone.
    let _ = writer.await;
    info!(conn_id = %conn_id, "socket disconnected");
}
