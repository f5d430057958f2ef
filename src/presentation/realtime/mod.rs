//! Realtime Activity Channel
//!
//! WebSocket endpoint that relays activity events to every connected socket.
//! Delivery is at-most-once and state is process-local.

pub mod events;
pub mod handler;
pub mod hub;
pub mod session;

use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};

use crate::shared::snowflake::SnowflakeGenerator;

pub use events::{ClientEvent, ClientEventError, Frame, ServerEvent};
pub use handler::socket_handler;
pub use hub::{Hub, SocketSender};
pub use session::{ConnectedSocket, Identity, Presence};

/// State the socket endpoint needs; extracted from the application state.
#[derive(Clone)]
pub struct RealtimeState {
    pub hub: Arc<Hub>,
    pub ids: Arc<SnowflakeGenerator>,
}

/// Router serving the socket endpoint at `/socket`.
pub fn router<S>() -> Router<S>
where
    RealtimeState: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/socket", get(socket_handler))
}
