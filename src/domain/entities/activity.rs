//! Activity entity, typed activity payloads and repository trait.
//!
//! An activity is a human-readable notification of a state change. Each
//! payload shape renders its own message; the payload itself travels along
//! unchanged in `data`.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::attendance::AttendanceAction;
use super::lead::LeadStatus;
use super::user::UserRole;
use crate::shared::error::AppError;

/// Kind of activity. The wire name doubles as the socket event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    NewActivity,
    EmployeeAdded,
    EmployeeUpdated,
    EmployeeDeleted,
    LeadCreated,
    LeadAssigned,
    LeadStatusChanged,
    LeadsUploaded,
    DealClosed,
    AttendanceUpdate,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 10] = [
        Self::NewActivity,
        Self::EmployeeAdded,
        Self::EmployeeUpdated,
        Self::EmployeeDeleted,
        Self::LeadCreated,
        Self::LeadAssigned,
        Self::LeadStatusChanged,
        Self::LeadsUploaded,
        Self::DealClosed,
        Self::AttendanceUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewActivity => "new_activity",
            Self::EmployeeAdded => "employee_added",
            Self::EmployeeUpdated => "employee_updated",
            Self::EmployeeDeleted => "employee_deleted",
            Self::LeadCreated => "lead_created",
            Self::LeadAssigned => "lead_assigned",
            Self::LeadStatusChanged => "lead_status_changed",
            Self::LeadsUploaded => "leads_uploaded",
            Self::DealClosed => "deal_closed",
            Self::AttendanceUpdate => "attendance_update",
        }
    }

    /// Look up the kind for a socket event name.
    pub fn from_event(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who caused an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Admin,
    Employee,
    System,
    #[default]
    Unknown,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
            Self::System => "system",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            "employee" => Self::Employee,
            "system" => Self::System,
            _ => Self::Unknown,
        }
    }
}

impl From<UserRole> for ActorType {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Admin => Self::Admin,
            UserRole::Employee => Self::Employee,
        }
    }
}

/// Actor fields attached to an activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub actor_type: ActorType,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            id: None,
            name: None,
            actor_type: ActorType::System,
        }
    }
}

/// A recorded or relayed activity.
///
/// Maps to the `activities` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - kind: VARCHAR(32) NOT NULL
/// - message: TEXT NOT NULL
/// - actor_id: BIGINT NULL
/// - actor_name: VARCHAR(100) NULL
/// - actor_type: VARCHAR(16) NOT NULL
/// - data: JSONB NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(with = "crate::shared::serde_id")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub message: String,
    #[serde(
        with = "crate::shared::serde_id::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub actor_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    pub actor_type: ActorType,
    pub data: serde_json::Value,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Activity {
    /// Build an activity from a payload. `data` is what clients receive verbatim.
    pub fn new(id: i64, payload: &ActivityPayload, actor: Actor, data: serde_json::Value) -> Self {
        Self {
            id,
            kind: payload.kind(),
            message: payload.message(),
            actor_id: actor.id,
            actor_name: actor.name,
            actor_type: actor.actor_type,
            data,
            created_at: Utc::now(),
        }
    }
}

/// Why a socket payload was rejected.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid payload for {kind}: {source}")]
    Malformed {
        kind: ActivityKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid payload for {kind}: {field} must not be empty")]
    EmptyField {
        kind: ActivityKind,
        field: &'static str,
    },
}

/// Free-form activity. Any extra fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomActivity {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub label: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAdded {
    pub employee_name: String,
    #[serde(default)]
    pub added_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdated {
    pub employee_name: String,
    #[serde(default)]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDeleted {
    pub employee_name: String,
    #[serde(default)]
    pub deleted_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadCreated {
    pub lead_name: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadAssigned {
    pub lead_name: String,
    pub employee_name: String,
    #[serde(default)]
    pub assigned_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStatusChanged {
    pub lead_name: String,
    pub status: LeadStatus,
    #[serde(default)]
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadsUploaded {
    pub count: u64,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealClosed {
    pub lead_name: String,
    pub employee_name: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceUpdate {
    pub employee_name: String,
    pub action: AttendanceAction,
}

/// Typed activity payloads, one per [`ActivityKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityPayload {
    NewActivity(CustomActivity),
    EmployeeAdded(EmployeeAdded),
    EmployeeUpdated(EmployeeUpdated),
    EmployeeDeleted(EmployeeDeleted),
    LeadCreated(LeadCreated),
    LeadAssigned(LeadAssigned),
    LeadStatusChanged(LeadStatusChanged),
    LeadsUploaded(LeadsUploaded),
    DealClosed(DealClosed),
    AttendanceUpdate(AttendanceUpdate),
}

fn parse_as<T: DeserializeOwned>(
    kind: ActivityKind,
    data: serde_json::Value,
) -> Result<T, PayloadError> {
    serde_json::from_value(data).map_err(|source| PayloadError::Malformed { kind, source })
}

fn require(kind: ActivityKind, field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.trim().is_empty() {
        Err(PayloadError::EmptyField { kind, field })
    } else {
        Ok(())
    }
}

fn by(name: &Option<String>, fallback: &'static str) -> String {
    name.as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

impl ActivityPayload {
    /// Parse and check the payload of a socket event of the given kind.
    pub fn parse(kind: ActivityKind, data: serde_json::Value) -> Result<Self, PayloadError> {
        let data = match data {
            serde_json::Value::Null if kind == ActivityKind::NewActivity => {
                serde_json::Value::Object(serde_json::Map::new())
            }
            other => other,
        };
        let payload = match kind {
            ActivityKind::NewActivity => Self::NewActivity(parse_as(kind, data)?),
            ActivityKind::EmployeeAdded => Self::EmployeeAdded(parse_as(kind, data)?),
            ActivityKind::EmployeeUpdated => Self::EmployeeUpdated(parse_as(kind, data)?),
            ActivityKind::EmployeeDeleted => Self::EmployeeDeleted(parse_as(kind, data)?),
            ActivityKind::LeadCreated => Self::LeadCreated(parse_as(kind, data)?),
            ActivityKind::LeadAssigned => Self::LeadAssigned(parse_as(kind, data)?),
            ActivityKind::LeadStatusChanged => Self::LeadStatusChanged(parse_as(kind, data)?),
            ActivityKind::LeadsUploaded => Self::LeadsUploaded(parse_as(kind, data)?),
            ActivityKind::DealClosed => Self::DealClosed(parse_as(kind, data)?),
            ActivityKind::AttendanceUpdate => Self::AttendanceUpdate(parse_as(kind, data)?),
        };
        payload.check()?;
        Ok(payload)
    }

    fn check(&self) -> Result<(), PayloadError> {
        let kind = self.kind();
        match self {
            Self::NewActivity(_) | Self::LeadsUploaded(_) => Ok(()),
            Self::EmployeeAdded(p) => require(kind, "employeeName", &p.employee_name),
            Self::EmployeeUpdated(p) => require(kind, "employeeName", &p.employee_name),
            Self::EmployeeDeleted(p) => require(kind, "employeeName", &p.employee_name),
            Self::LeadCreated(p) => require(kind, "leadName", &p.lead_name),
            Self::LeadAssigned(p) => {
                require(kind, "leadName", &p.lead_name)?;
                require(kind, "employeeName", &p.employee_name)
            }
            Self::LeadStatusChanged(p) => require(kind, "leadName", &p.lead_name),
            Self::DealClosed(p) => {
                require(kind, "leadName", &p.lead_name)?;
                require(kind, "employeeName", &p.employee_name)
            }
            Self::AttendanceUpdate(p) => require(kind, "employeeName", &p.employee_name),
        }
    }

    pub fn kind(&self) -> ActivityKind {
        match self {
            Self::NewActivity(_) => ActivityKind::NewActivity,
            Self::EmployeeAdded(_) => ActivityKind::EmployeeAdded,
            Self::EmployeeUpdated(_) => ActivityKind::EmployeeUpdated,
            Self::EmployeeDeleted(_) => ActivityKind::EmployeeDeleted,
            Self::LeadCreated(_) => ActivityKind::LeadCreated,
            Self::LeadAssigned(_) => ActivityKind::LeadAssigned,
            Self::LeadStatusChanged(_) => ActivityKind::LeadStatusChanged,
            Self::LeadsUploaded(_) => ActivityKind::LeadsUploaded,
            Self::DealClosed(_) => ActivityKind::DealClosed,
            Self::AttendanceUpdate(_) => ActivityKind::AttendanceUpdate,
        }
    }

    /// Render the human-readable message.
    pub fn message(&self) -> String {
        match self {
            Self::NewActivity(p) => match (&p.message, &p.user_name) {
                (Some(msg), _) if !msg.trim().is_empty() => msg.trim().to_string(),
                (_, Some(user)) if !user.trim().is_empty() => {
                    format!("{} posted an update", user.trim())
                }
                _ => "New activity".to_string(),
            },
            Self::EmployeeAdded(p) => format!(
                "{} added new employee {}",
                by(&p.added_by, "Admin"),
                p.employee_name.trim()
            ),
            Self::EmployeeUpdated(p) => format!(
                "{} updated employee {}",
                by(&p.updated_by, "Admin"),
                p.employee_name.trim()
            ),
            Self::EmployeeDeleted(p) => format!(
                "{} removed employee {}",
                by(&p.deleted_by, "Admin"),
                p.employee_name.trim()
            ),
            Self::LeadCreated(p) => format!(
                "{} created lead {}",
                by(&p.created_by, "Admin"),
                p.lead_name.trim()
            ),
            Self::LeadAssigned(p) => format!(
                "{} assigned lead {} to {}",
                by(&p.assigned_by, "Admin"),
                p.lead_name.trim(),
                p.employee_name.trim()
            ),
            Self::LeadStatusChanged(p) => format!(
                "{} changed status of lead {} to {}",
                by(&p.changed_by, "Someone"),
                p.lead_name.trim(),
                p.status
            ),
            Self::LeadsUploaded(p) => format!(
                "{} uploaded {} {}",
                by(&p.uploaded_by, "Admin"),
                p.count,
                if p.count == 1 { "lead" } else { "leads" }
            ),
            Self::DealClosed(p) => {
                let mut msg = format!(
                    "{} closed the deal with {}",
                    p.employee_name.trim(),
                    p.lead_name.trim()
                );
                if let Some(amount) = p.amount {
                    msg.push_str(&format!(" worth {:.2}", amount));
                }
                msg
            }
            Self::AttendanceUpdate(p) => {
                format!("{} {}", p.employee_name.trim(), p.action.describe())
            }
        }
    }

    /// Serialize the payload back to the JSON shape clients send.
    pub fn to_data(&self) -> serde_json::Value {
        let value = match self {
            Self::NewActivity(p) => serde_json::to_value(p),
            Self::EmployeeAdded(p) => serde_json::to_value(p),
            Self::EmployeeUpdated(p) => serde_json::to_value(p),
            Self::EmployeeDeleted(p) => serde_json::to_value(p),
            Self::LeadCreated(p) => serde_json::to_value(p),
            Self::LeadAssigned(p) => serde_json::to_value(p),
            Self::LeadStatusChanged(p) => serde_json::to_value(p),
            Self::LeadsUploaded(p) => serde_json::to_value(p),
            Self::DealClosed(p) => serde_json::to_value(p),
            Self::AttendanceUpdate(p) => serde_json::to_value(p),
        };
        value.unwrap_or_default()
    }
}

/// Repository trait for persisted activities.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, activity: &Activity) -> Result<Activity, AppError>;

    /// Most recent activities, newest first.
    async fn recent(&self, limit: i64) -> Result<Vec<Activity>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    fn render(kind: &str, data: serde_json::Value) -> String {
        let kind = ActivityKind::from_event(kind).expect("known event");
        ActivityPayload::parse(kind, data).unwrap().message()
    }

    #[test_case("employee_added", json!({"employeeName": "Ravi", "addedBy": "Meera"}), "Meera added new employee Ravi" ; "message_1")]
    #[test_case("employee_added", json!({"employeeName": "Ravi"}), "Admin added new employee Ravi" ; "message_2")]
    #[test_case("employee_deleted", json!({"employeeName": "Ravi", "deletedBy": " "}), "Admin removed employee Ravi" ; "message_3")]
    #[test_case("lead_assigned", json!({"leadName": "Acme", "employeeName": "Ravi", "assignedBy": "Meera"}), "Meera assigned lead Acme to Ravi" ; "message_4")]
    #[test_case("lead_status_changed", json!({"leadName": "Acme", "status": "ongoing", "changedBy": "Ravi"}), "Ravi changed status of lead Acme to ongoing" ; "message_5")]
    #[test_case("leads_uploaded", json!({"count": 1}), "Admin uploaded 1 lead" ; "message_6")]
    #[test_case("leads_uploaded", json!({"count": 25, "uploadedBy": "Meera"}), "Meera uploaded 25 leads" ; "message_7")]
    #[test_case("deal_closed", json!({"leadName": "Acme", "employeeName": "Ravi", "amount": 1500}), "Ravi closed the deal with Acme worth 1500.00" ; "message_8")]
    #[test_case("deal_closed", json!({"leadName": "Acme", "employeeName": "Ravi"}), "Ravi closed the deal with Acme" ; "message_9")]
    #[test_case("attendance_update", json!({"employeeName": "Ravi", "action": "break_start"}), "Ravi started a break" ; "message_10")]
    #[test_case("new_activity", json!({"message": "Quarterly targets updated"}), "Quarterly targets updated" ; "message_11")]
    #[test_case("new_activity", json!({"userName": "Meera"}), "Meera posted an update" ; "message_12")]
    #[test_case("new_activity", json!({}), "New activity" ; "message_13")]
    fn renders_messages(kind: &str, data: serde_json::Value, expected: &str) {
        assert_eq!(render(kind, data), expected);
    }

    #[test]
    fn event_names_round_trip() {
        for kind in ActivityKind::ALL {
            assert_eq!(ActivityKind::from_event(kind.as_str()), Some(kind));
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
        assert_eq!(ActivityKind::from_event("join"), None);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = ActivityPayload::parse(ActivityKind::LeadAssigned, json!({"leadName": "Acme"}))
            .unwrap_err();
        assert!(matches!(err, PayloadError::Malformed { .. }));
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let err = ActivityPayload::parse(
            ActivityKind::EmployeeAdded,
            json!({"employeeName": "   "}),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PayloadError::EmptyField {
                field: "employeeName",
                ..
            }
        ));
    }

    #[test]
    fn custom_activity_keeps_extra_fields() {
        let payload = ActivityPayload::parse(
            ActivityKind::NewActivity,
            json!({"message": "hi", "priority": "high"}),
        )
        .unwrap();
        assert_eq!(payload.to_data()["priority"], "high");
    }

    #[test]
    fn activity_serializes_camel_case_with_string_ids() {
        let payload = ActivityPayload::LeadsUploaded(LeadsUploaded {
            count: 3,
            uploaded_by: None,
        });
        let activity = Activity::new(
            987654321987654321,
            &payload,
            Actor {
                id: Some(11),
                name: Some("Meera".into()),
                actor_type: ActorType::Admin,
            },
            payload.to_data(),
        );
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["id"], "987654321987654321");
        assert_eq!(json["type"], "leads_uploaded");
        assert_eq!(json["actorId"], "11");
        assert_eq!(json["actorType"], "admin");
        assert_eq!(json["data"]["count"], 3);
        assert!(json.get("timestamp").is_some());
    }
}
