// WebSocket endpoint for status subscribers
// The server only pushes; client input is read to notice disconnects.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;

use super::server::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Handle subscriber WebSocket connections
pub async fn handle_status_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_status_socket(socket, state))
}

async fn handle_status_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    let subscriber_id = state.broadcaster.subscribe(tx).await;
    tracing::info!(subscriber_id, "Subscriber connected");

    // Forward broadcast messages to the socket, pinging on idle intervals
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        loop {
            tokio::select! {
                message = rx.recv() => {
                    let Some(text) = message else { break };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                    tracing::trace!(subscriber_id, "Sent heartbeat ping");
                }
            }
        }
    });

    // Drain client input until the connection closes
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    tracing::trace!(subscriber_id, "Ignoring client message: {}", text);
                },
                Message::Close(_) => break,
                _ => {},
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.broadcaster.unsubscribe(subscriber_id).await;
    tracing::info!(subscriber_id, "Subscriber disconnected");
}
