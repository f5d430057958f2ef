//! Connected socket records and presence snapshots.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Actor, ActorType};

/// Self-declared identity sent with `join`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub user_type: ActorType,
}

/// One live socket. Lives only as long as the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedSocket {
    pub socket_id: String,
    #[serde(
        with = "crate::shared::serde_id::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub user_type: ActorType,
    pub joined_at: DateTime<Utc>,
}

impl ConnectedSocket {
    pub fn new(socket_id: String) -> Self {
        Self {
            socket_id,
            user_id: None,
            user_name: None,
            user_type: ActorType::Unknown,
            joined_at: Utc::now(),
        }
    }

    /// Replace the identity fields; `joined_at` is kept.
    pub fn apply(&mut self, identity: Identity) {
        self.user_id = identity.user_id;
        self.user_name = identity.user_name;
        self.user_type = identity.user_type;
    }

    pub fn clear_identity(&mut self) {
        self.apply(Identity::default());
    }

    /// Actor attributed to activities relayed from this socket.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            name: self.user_name.clone(),
            actor_type: self.user_type,
        }
    }
}

/// Snapshot broadcast as `presence_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub count: usize,
    pub distinct_users: usize,
    pub users: Vec<ConnectedSocket>,
}

impl Presence {
    pub fn from_sockets(mut users: Vec<ConnectedSocket>) -> Self {
        users.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.socket_id.cmp(&b.socket_id))
        });
        let distinct_users = users
            .iter()
            .filter_map(|s| s.user_id)
            .collect::<HashSet<_>>()
            .len();
        Self {
            count: users.len(),
            distinct_users,
            users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_replaces_identity_but_keeps_joined_at() {
        let mut socket = ConnectedSocket::new("s1".into());
        let joined_at = socket.joined_at;
        socket.apply(Identity {
            user_id: Some(5),
            user_name: Some("Ravi".into()),
            user_type: ActorType::Employee,
        });
        assert_eq!(socket.user_id, Some(5));
        assert_eq!(socket.joined_at, joined_at);

        socket.clear_identity();
        assert_eq!(socket.user_type, ActorType::Unknown);
        assert_eq!(socket.user_name, None);
    }

    #[test]
    fn presence_counts_distinct_users() {
        let mut a = ConnectedSocket::new("a".into());
        a.user_id = Some(1);
        let mut b = ConnectedSocket::new("b".into());
        b.user_id = Some(1);
        let c = ConnectedSocket::new("c".into());

        let presence = Presence::from_sockets(vec![c, b, a]);
        assert_eq!(presence.count, 3);
        assert_eq!(presence.distinct_users, 1);

        let json = serde_json::to_value(&presence).unwrap();
        assert_eq!(json["distinctUsers"], 1);
        assert!(json["users"][0].get("socketId").is_some());
    }
}
