//! Realtime Hub
//!
//! Process-local registry of connected sockets plus the fan-out channel.
//! Socket tasks subscribe to the broadcast channel; direct replies go through
//! each socket's own mpsc sender.

use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use super::events::ServerEvent;
use super::session::{ConnectedSocket, Identity, Presence};
use crate::application::services::ActivityBroadcaster;
use crate::config::WebSocketSettings;
use crate::domain::Activity;
use crate::infrastructure::metrics;

/// Per-socket outbound queue.
pub type SocketSender = mpsc::UnboundedSender<ServerEvent>;

struct SocketEntry {
    socket: ConnectedSocket,
    sender: SocketSender,
}

pub struct Hub {
    sockets: DashMap<String, SocketEntry>,
    event_tx: broadcast::Sender<ServerEvent>,
    heartbeat_interval_ms: u64,
    idle_timeout_ms: u64,
    max_message_size: usize,
}

impl Hub {
    pub fn new(settings: &WebSocketSettings) -> Self {
        let (event_tx, _) = broadcast::channel(settings.broadcast_capacity.max(1));
        Self {
            sockets: DashMap::new(),
            event_tx,
            heartbeat_interval_ms: settings.heartbeat_interval_ms,
            idle_timeout_ms: settings.idle_timeout_ms(),
            max_message_size: settings.max_message_size,
        }
    }

    /// Interval clients are told to ping at, in milliseconds.
    pub fn heartbeat_interval(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Subscribe to broadcast events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.event_tx.subscribe()
    }

    /// Add a socket with an unknown identity.
    pub fn register(&self, socket_id: String, sender: SocketSender) -> ConnectedSocket {
        let socket = ConnectedSocket::new(socket_id.clone());
        self.sockets.insert(
            socket_id.clone(),
            SocketEntry {
                socket: socket.clone(),
                sender,
            },
        );
        metrics::set_sockets_connected(self.sockets.len());

        tracing::info!(socket_id = %socket_id, online = self.sockets.len(), "Socket registered");
        socket
    }

    /// Record the identity a socket declared with `join`.
    pub fn join(&self, socket_id: &str, identity: Identity) -> Option<ConnectedSocket> {
        let mut entry = self.sockets.get_mut(socket_id)?;
        entry.socket.apply(identity);
        let socket = entry.socket.clone();
        drop(entry);

        tracing::info!(
            socket_id = %socket_id,
            user_id = ?socket.user_id,
            user_type = socket.user_type.as_str(),
            "Socket joined"
        );
        Some(socket)
    }

    /// Reset a socket back to an unknown identity.
    pub fn leave(&self, socket_id: &str) -> Option<ConnectedSocket> {
        let mut entry = self.sockets.get_mut(socket_id)?;
        entry.socket.clear_identity();
        let socket = entry.socket.clone();
        drop(entry);

        tracing::debug!(socket_id = %socket_id, "Socket left");
        Some(socket)
    }

    pub fn unregister(&self, socket_id: &str) -> Option<ConnectedSocket> {
        let (_, entry) = self.sockets.remove(socket_id)?;
        metrics::set_sockets_connected(self.sockets.len());

        tracing::info!(
            socket_id = %socket_id,
            user_id = ?entry.socket.user_id,
            online = self.sockets.len(),
            "Socket unregistered"
        );
        Some(entry.socket)
    }

    /// Current identity of a socket.
    pub fn socket(&self, socket_id: &str) -> Option<ConnectedSocket> {
        self.sockets.get(socket_id).map(|e| e.socket.clone())
    }

    /// Fan an event out to every subscribed socket. Returns the number of
    /// receivers; zero when nobody is connected.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        self.event_tx.send(event).unwrap_or(0)
    }

    pub fn broadcast_activity(&self, activity: Activity) -> usize {
        metrics::record_activity_broadcast(activity.kind.as_str());
        tracing::debug!(
            activity_id = activity.id,
            kind = %activity.kind,
            "Broadcasting activity"
        );
        self.broadcast(ServerEvent::ActivityUpdate(activity))
    }

    pub fn broadcast_presence(&self) -> usize {
        self.broadcast(ServerEvent::PresenceUpdate(self.presence()))
    }

    /// Send directly to one socket, bypassing the broadcast channel.
    pub fn send_to(&self, socket_id: &str, event: ServerEvent) -> bool {
        self.sockets
            .get(socket_id)
            .map(|e| e.sender.send(event).is_ok())
            .unwrap_or(false)
    }

    pub fn online(&self) -> Vec<ConnectedSocket> {
        self.sockets.iter().map(|e| e.socket.clone()).collect()
    }

    pub fn presence(&self) -> Presence {
        Presence::from_sockets(self.online())
    }

    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_user_online(&self, user_id: i64) -> bool {
        self.sockets
            .iter()
            .any(|e| e.socket.user_id == Some(user_id))
    }
}

impl ActivityBroadcaster for Hub {
    fn broadcast_activity(&self, activity: Activity) -> usize {
        Hub::broadcast_activity(self, activity)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(&WebSocketSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityPayload, Actor, ActorType, LeadsUploaded};
    use pretty_assertions::assert_eq;

    fn employee(id: i64, name: &str) -> Identity {
        Identity {
            user_id: Some(id),
            user_name: Some(name.into()),
            user_type: ActorType::Employee,
        }
    }

    #[test]
    fn register_join_leave_unregister() {
        let hub = Hub::default();
        let (tx, _rx) = mpsc::unbounded_channel();

        let socket = hub.register("s1".into(), tx);
        assert_eq!(socket.user_type, ActorType::Unknown);
        assert_eq!(hub.socket_count(), 1);
        assert!(!hub.is_user_online(7));

        let joined = hub.join("s1", employee(7, "Ravi")).unwrap();
        assert_eq!(joined.user_id, Some(7));
        assert!(hub.is_user_online(7));

        hub.leave("s1");
        assert!(!hub.is_user_online(7));
        assert_eq!(hub.socket("s1").unwrap().user_type, ActorType::Unknown);

        assert!(hub.unregister("s1").is_some());
        assert!(hub.unregister("s1").is_none());
        assert_eq!(hub.socket_count(), 0);
    }

    #[test]
    fn join_unknown_socket_is_none() {
        let hub = Hub::default();
        assert!(hub.join("missing", employee(1, "A")).is_none());
    }

    #[test]
    fn presence_keeps_duplicate_user_sockets() {
        let hub = Hub::default();
        for id in ["a", "b", "c"] {
            let (tx, _rx) = mpsc::unbounded_channel();
            hub.register(id.into(), tx);
        }
        hub.join("a", employee(1, "Ravi"));
        hub.join("b", employee(1, "Ravi"));

        let presence = hub.presence();
        assert_eq!(presence.count, 3);
        assert_eq!(presence.distinct_users, 1);
    }

    #[test]
    fn send_to_reaches_only_target() {
        let hub = Hub::default();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register("one".into(), tx1);
        hub.register("two".into(), tx2);

        assert!(hub.send_to("one", ServerEvent::error("nope")));
        assert!(!hub.send_to("ghost", ServerEvent::error("nope")));

        assert_eq!(rx1.try_recv().unwrap(), ServerEvent::error("nope"));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let hub = Hub::default();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let payload = ActivityPayload::LeadsUploaded(LeadsUploaded {
            count: 2,
            uploaded_by: None,
        });
        let activity = Activity::new(1, &payload, Actor::system(), payload.to_data());
        assert_eq!(hub.broadcast_activity(activity.clone()), 2);

        assert_eq!(
            first.recv().await.unwrap(),
            ServerEvent::ActivityUpdate(activity.clone())
        );
        assert_eq!(
            second.recv().await.unwrap(),
            ServerEvent::ActivityUpdate(activity)
        );
    }

    #[test]
    fn broadcast_without_subscribers_is_dropped() {
        let hub = Hub::default();
        assert_eq!(hub.broadcast(ServerEvent::Pong(serde_json::Value::Null)), 0);
    }

    #[tokio::test]
    async fn lagging_receiver_skips_events() {
        let hub = Hub::new(&WebSocketSettings {
            broadcast_capacity: 2,
            ..WebSocketSettings::default()
        });
        let mut rx = hub.subscribe();
        for i in 0..5 {
            hub.broadcast(ServerEvent::Pong(serde_json::json!(i)));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap(), ServerEvent::Pong(serde_json::json!(3)));
    }
}
