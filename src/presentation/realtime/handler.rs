//! Socket connection handler.
//!
//! One task per connection selects over inbound frames, hub broadcasts and
//! the idle timer. A separate writer task drains the socket's mpsc queue.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, timeout, Instant};
use uuid::Uuid;

use super::events::{ClientEvent, ServerEvent};
use super::hub::SocketSender;
use super::RealtimeState;
use crate::domain::Activity;
use crate::infrastructure::metrics;

/// Time the writer gets to flush queued frames after the read loop ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket upgrade handler for `/socket`.
pub async fn socket_handler(ws: WebSocketUpgrade, State(state): State<RealtimeState>) -> Response {
    let max_size = state.hub.max_message_size();
    ws.max_message_size(max_size)
        .max_frame_size(max_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RealtimeState) {
    let socket_id = Uuid::new_v4().to_string();
    let hub = state.hub.clone();

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Subscribe before registering so nothing broadcast after `connected` is missed.
    let mut events = hub.subscribe();
    hub.register(socket_id.clone(), tx.clone());

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if sink.send(Message::Text(event.to_text().into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let _ = tx.send(ServerEvent::Connected {
        socket_id: socket_id.clone(),
        heartbeat_interval: hub.heartbeat_interval(),
    });

    let idle_timeout = hub.idle_timeout();
    let idle = sleep_until(Instant::now() + idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        handle_frame(text.as_str(), &socket_id, &state, &tx);
                    }
                    Some(Ok(Message::Binary(_))) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        let _ = tx.send(ServerEvent::error("binary frames are not supported"));
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pong replies are handled by axum
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(socket_id = %socket_id, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(socket_id = %socket_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        metrics::record_lagged(n);
                        tracing::warn!(
                            socket_id = %socket_id,
                            skipped = n,
                            "Event receiver lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::error!("Hub event channel closed");
                        break;
                    }
                }
            }

            _ = &mut idle => {
                tracing::info!(
                    socket_id = %socket_id,
                    idle_ms = idle_timeout.as_millis() as u64,
                    "Idle timeout, closing connection"
                );
                break;
            }
        }
    }

    if hub.unregister(&socket_id).is_some() {
        hub.broadcast_presence();
    }

    // The hub entry held the other sender; dropping ours lets the writer finish.
    drop(tx);
    if timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        tracing::debug!(socket_id = %socket_id, "Writer did not drain in time");
    }
}

/// Handle one inbound text frame. Errors go back to the sender only.
fn handle_frame(text: &str, socket_id: &str, state: &RealtimeState, tx: &SocketSender) {
    let hub = &state.hub;
    let event = match ClientEvent::parse(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(socket_id = %socket_id, error = %e, "Rejected frame");
            let _ = tx.send(ServerEvent::error(e.to_string()));
            return;
        }
    };

    match event {
        ClientEvent::Join(identity) => {
            if hub.join(socket_id, identity).is_some() {
                let _ = tx.send(ServerEvent::Joined {
                    socket_id: socket_id.to_string(),
                    online_count: hub.socket_count(),
                });
                hub.broadcast_presence();
            }
        }
        ClientEvent::Leave => {
            if hub.leave(socket_id).is_some() {
                hub.broadcast_presence();
            }
        }
        ClientEvent::Ping(data) => {
            let _ = tx.send(ServerEvent::Pong(data));
        }
        ClientEvent::Activity { payload, data } => {
            let actor = hub
                .socket(socket_id)
                .map(|s| s.actor())
                .unwrap_or_default();
            let activity = Activity::new(state.ids.generate(), &payload, actor, data);
            tracing::debug!(
                socket_id = %socket_id,
                event = %activity.kind,
                "Relaying activity"
            );
            hub.broadcast_activity(activity);
        }
    }
}
