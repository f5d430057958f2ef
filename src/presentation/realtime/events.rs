//! Realtime wire protocol.
//!
//! Every text frame is `{"event": "<name>", "data": <json>}`. Inbound frames
//! are parsed into [`ClientEvent`]; outbound frames are built from
//! [`ServerEvent`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::session::{Identity, Presence};
use crate::domain::{Activity, ActivityKind, ActivityPayload, ActorType, PayloadError};

/// A single socket frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn parse(text: &str) -> Result<Self, ClientEventError> {
        serde_json::from_str(text).map_err(ClientEventError::InvalidJson)
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Why an inbound frame was rejected. Sent back to the sender as `error`.
#[derive(Debug, thiserror::Error)]
pub enum ClientEventError {
    #[error("invalid frame: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("invalid join payload: {0}")]
    InvalidJoin(#[source] serde_json::Error),

    #[error(transparent)]
    InvalidPayload(#[from] PayloadError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinPayload {
    #[serde(default, with = "crate::shared::serde_id::option")]
    user_id: Option<i64>,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    user_type: Option<String>,
}

impl From<JoinPayload> for Identity {
    fn from(p: JoinPayload) -> Self {
        Identity {
            user_id: p.user_id,
            user_name: p
                .user_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            user_type: p
                .user_type
                .as_deref()
                .map(|t| ActorType::from_db(&t.trim().to_ascii_lowercase()))
                .unwrap_or_default(),
        }
    }
}

/// A decoded client → server event.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Join(Identity),
    Leave,
    Ping(Value),
    /// An activity event to relay. `data` is the payload as sent.
    Activity {
        payload: ActivityPayload,
        data: Value,
    },
}

impl ClientEvent {
    pub fn from_frame(frame: Frame) -> Result<Self, ClientEventError> {
        match frame.event.as_str() {
            "join" => {
                let payload: JoinPayload = match frame.data {
                    Value::Null => JoinPayload::default(),
                    data => serde_json::from_value(data).map_err(ClientEventError::InvalidJoin)?,
                };
                Ok(Self::Join(payload.into()))
            }
            "leave" => Ok(Self::Leave),
            "ping" => Ok(Self::Ping(frame.data)),
            name => {
                let kind = ActivityKind::from_event(name)
                    .ok_or_else(|| ClientEventError::UnknownEvent(name.to_string()))?;
                let data = match frame.data {
                    Value::Null => json!({}),
                    data => data,
                };
                let payload = ActivityPayload::parse(kind, data.clone())?;
                Ok(Self::Activity { payload, data })
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, ClientEventError> {
        Self::from_frame(Frame::parse(text)?)
    }
}

/// A server → client event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connected {
        socket_id: String,
        heartbeat_interval: u64,
    },
    Joined {
        socket_id: String,
        online_count: usize,
    },
    PresenceUpdate(Presence),
    ActivityUpdate(Activity),
    Pong(Value),
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Joined { .. } => "joined",
            Self::PresenceUpdate(_) => "presence_update",
            Self::ActivityUpdate(_) => "activity_update",
            Self::Pong(_) => "pong",
            Self::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::Connected {
                socket_id,
                heartbeat_interval,
            } => json!({ "socketId": socket_id, "heartbeatInterval": heartbeat_interval }),
            Self::Joined {
                socket_id,
                online_count,
            } => json!({ "socketId": socket_id, "onlineCount": online_count }),
            Self::PresenceUpdate(presence) => serde_json::to_value(presence).unwrap_or_default(),
            Self::ActivityUpdate(activity) => serde_json::to_value(activity).unwrap_or_default(),
            Self::Pong(data) => data.clone(),
            Self::Error { message } => json!({ "message": message }),
        };
        Frame::new(self.name(), data)
    }

    pub fn to_text(&self) -> String {
        self.to_frame().to_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_join_with_numeric_or_string_ids() {
        let event =
            ClientEvent::parse(r#"{"event":"join","data":{"userId":"42","userName":" Asha ","userType":"Admin"}}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::Join(Identity {
                user_id: Some(42),
                user_name: Some("Asha".into()),
                user_type: ActorType::Admin,
            })
        );

        let event = ClientEvent::parse(r#"{"event":"join","data":{"userId":7}}"#).unwrap();
        assert!(matches!(event, ClientEvent::Join(Identity { user_id: Some(7), .. })));
    }

    #[test]
    fn join_without_data_is_anonymous() {
        let event = ClientEvent::parse(r#"{"event":"join"}"#).unwrap();
        assert_eq!(event, ClientEvent::Join(Identity::default()));
    }

    #[test]
    fn ping_echoes_data() {
        let event = ClientEvent::parse(r#"{"event":"ping","data":{"t":1}}"#).unwrap();
        assert_eq!(event, ClientEvent::Ping(json!({"t": 1})));
    }

    #[test]
    fn activity_keeps_original_data() {
        let event = ClientEvent::parse(
            r#"{"event":"lead_created","data":{"leadName":"Acme","source":"web"}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::Activity { payload, data } => {
                assert_eq!(payload.kind(), ActivityKind::LeadCreated);
                assert_eq!(data["source"], "web");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn rejects_bad_frames() {
        assert!(matches!(
            ClientEvent::parse("not json"),
            Err(ClientEventError::InvalidJson(_))
        ));
        assert!(matches!(
            ClientEvent::parse(r#"{"event":"teleport"}"#),
            Err(ClientEventError::UnknownEvent(name)) if name == "teleport"
        ));
        assert!(matches!(
            ClientEvent::parse(r#"{"event":"deal_closed","data":{"leadName":"Acme"}}"#),
            Err(ClientEventError::InvalidPayload(_))
        ));
    }

    #[test]
    fn server_events_render_expected_shapes() {
        let frame = ServerEvent::Connected {
            socket_id: "abc".into(),
            heartbeat_interval: 25000,
        }
        .to_frame();
        assert_eq!(frame.event, "connected");
        assert_eq!(frame.data, json!({"socketId": "abc", "heartbeatInterval": 25000}));

        let frame = ServerEvent::error("boom").to_frame();
        assert_eq!(frame, Frame::new("error", json!({"message": "boom"})));

        let text = ServerEvent::Pong(json!(5)).to_text();
        assert_eq!(text, r#"{"event":"pong","data":5}"#);
    }
}
