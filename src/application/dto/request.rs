//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{ActivityPayload, CustomActivity, LeadStatus, LeadType, UserStatus};
use crate::shared::pagination::{PageParams, DEFAULT_PAGE_SIZE};

fn paging(page: Option<u32>, limit: Option<u32>) -> PageParams {
    PageParams::new(page.unwrap_or(1), limit.unwrap_or(DEFAULT_PAGE_SIZE))
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh or logout request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Create employee request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[validate(length(max = 50, message = "Language must be at most 50 characters"))]
    pub language: Option<String>,
}

/// Update employee request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[validate(length(max = 50, message = "Language must be at most 50 characters"))]
    pub language: Option<String>,

    pub status: Option<UserStatus>,
}

/// Employee list query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeQuery {
    pub search: Option<String>,
    pub status: Option<UserStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl EmployeeQuery {
    pub fn paging(&self) -> PageParams {
        paging(self.page, self.limit)
    }
}

/// Create lead request, also one row of a bulk upload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateLeadRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 100, message = "Source must be at most 100 characters"))]
    pub source: Option<String>,

    pub status: Option<LeadStatus>,

    #[serde(rename = "type", alias = "lead_type")]
    pub lead_type: Option<LeadType>,

    #[validate(length(max = 50, message = "Language must be at most 50 characters"))]
    pub language: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    #[serde(default, with = "crate::shared::serde_id::option")]
    pub assigned_to: Option<i64>,

    pub received_at: Option<DateTime<Utc>>,
}

/// Update lead request. Absent fields are left unchanged; status changes go
/// through the status endpoint.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLeadRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "Phone must be at most 32 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 100, message = "Source must be at most 100 characters"))]
    pub source: Option<String>,

    #[serde(rename = "type", alias = "lead_type")]
    pub lead_type: Option<LeadType>,

    #[validate(length(max = 50, message = "Language must be at most 50 characters"))]
    pub language: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    pub received_at: Option<DateTime<Utc>>,
}

/// Bulk lead upload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkLeadsRequest {
    #[validate(
        length(min = 1, max = 1000, message = "Upload between 1 and 1000 leads"),
        nested
    )]
    pub leads: Vec<CreateLeadRequest>,

    #[serde(default)]
    pub auto_assign: bool,
}

/// Lead list query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    #[serde(rename = "type")]
    pub lead_type: Option<LeadType>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl LeadQuery {
    pub fn paging(&self) -> PageParams {
        paging(self.page, self.limit)
    }
}

/// Assign a lead to an employee
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignLeadRequest {
    #[serde(with = "crate::shared::serde_id")]
    pub employee_id: i64,
}

/// Move a lead to another status
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateLeadStatusRequest {
    pub status: LeadStatus,
}

/// Activity feed query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<u32>,
}

/// Custom activity posted from the dashboard
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateActivityRequest {
    #[serde(rename = "type")]
    #[validate(length(max = 50, message = "Type must be at most 50 characters"))]
    pub label: Option<String>,

    #[validate(length(min = 1, max = 500, message = "Message must be 1-500 characters"))]
    pub message: String,

    pub data: Option<serde_json::Value>,
}

impl CreateActivityRequest {
    /// Build the `new_activity` payload. Object `data` is merged into the
    /// payload; any other value is kept under `value`.
    pub fn into_payload(self, user_name: Option<String>) -> ActivityPayload {
        let mut extra = match self.data {
            Some(serde_json::Value::Object(map)) => map,
            Some(serde_json::Value::Null) | None => serde_json::Map::new(),
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("value".into(), other);
                map
            }
        };
        for reserved in ["message", "type", "userName"] {
            extra.remove(reserved);
        }

        ActivityPayload::NewActivity(CustomActivity {
            message: Some(self.message.trim().to_string()),
            label: self.label,
            user_name,
            extra,
        })
    }
}

/// Date range for attendance listings, inclusive. Defaults to the last 30 days.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bulk_rejects_empty_and_invalid_rows() {
        let empty: BulkLeadsRequest = serde_json::from_value(json!({"leads": []})).unwrap();
        assert!(empty.validate().is_err());

        let bad_row: BulkLeadsRequest = serde_json::from_value(json!({
            "leads": [{"name": "Acme", "email": "not-an-email"}],
            "auto_assign": true
        }))
        .unwrap();
        assert!(bad_row.auto_assign);
        assert!(bad_row.validate().is_err());
    }

    #[test]
    fn bulk_caps_batch_size() {
        let row = CreateLeadRequest {
            name: "Acme".into(),
            ..CreateLeadRequest::default()
        };
        let full = BulkLeadsRequest {
            leads: vec![row.clone(); 1000],
            auto_assign: false,
        };
        assert!(full.validate().is_ok());

        let over = BulkLeadsRequest {
            leads: vec![row; 1001],
            auto_assign: false,
        };
        let errors = over.validate().unwrap_err();
        assert!(errors.errors().contains_key("leads"));
    }

    #[test]
    fn lead_request_accepts_type_and_string_assignee() {
        let req: CreateLeadRequest = serde_json::from_value(json!({
            "name": "Acme",
            "type": "hot",
            "assigned_to": "123456789012345678"
        }))
        .unwrap();
        assert_eq!(req.lead_type, Some(LeadType::Hot));
        assert_eq!(req.assigned_to, Some(123456789012345678));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn employee_request_requires_long_password() {
        let req = CreateEmployeeRequest {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "short".into(),
            phone: None,
            location: None,
            language: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn custom_activity_merges_data() {
        let req: CreateActivityRequest = serde_json::from_value(json!({
            "type": "note",
            "message": " Call back Acme ",
            "data": {"priority": "high", "message": "ignored"}
        }))
        .unwrap();
        let payload = req.into_payload(Some("Meera".into()));
        assert_eq!(payload.message(), "Call back Acme");

        let data = payload.to_data();
        assert_eq!(data["priority"], "high");
        assert_eq!(data["type"], "note");
        assert_eq!(data["userName"], "Meera");
    }

    #[test]
    fn lead_query_paging_is_clamped() {
        let q: LeadQuery =
            serde_json::from_value(json!({"status": "open", "page": 0, "limit": 500})).unwrap();
        assert_eq!(q.status, Some(LeadStatus::Open));
        let paging = q.paging();
        assert_eq!(paging.page, 1);
        assert_eq!(paging.limit, 100);

        let defaults = EmployeeQuery::default().paging();
        assert_eq!((defaults.page, defaults.limit), (1, 20));
    }
}
