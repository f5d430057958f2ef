//! Response DTOs
//!
//! Data structures for API response bodies. Snowflake ids are sent as strings
//! so JavaScript clients do not lose precision.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::application::services::{AuthTokens, BulkUploadResult, TodayAttendance};
use crate::domain::{
    Activity, AttendanceRecord, AttendanceStatus, BreakPeriod, EmployeeOverview, Lead, LeadStatus,
    LeadType, User, UserRole, UserStatus,
};

/// Authentication tokens response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl From<AuthTokens> for TokenResponse {
    fn from(tokens: AuthTokens) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            token_type: tokens.token_type,
        }
    }
}

/// Login response (user and tokens)
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

/// User response
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            location: user.location,
            language: user.language,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Employee with lead counts
#[derive(Debug, Serialize)]
pub struct EmployeeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub assigned_leads: i64,
    pub closed_leads: i64,
}

impl From<EmployeeOverview> for EmployeeResponse {
    fn from(overview: EmployeeOverview) -> Self {
        Self {
            user: overview.employee.into(),
            assigned_leads: overview.assigned_leads,
            closed_leads: overview.closed_leads,
        }
    }
}

/// Lead response
#[derive(Debug, Serialize)]
pub struct LeadResponse {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    #[serde(rename = "type")]
    pub lead_type: LeadType,
    pub language: Option<String>,
    pub location: Option<String>,
    pub assigned_to: Option<String>,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Lead> for LeadResponse {
    fn from(lead: Lead) -> Self {
        Self {
            id: lead.id.to_string(),
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            source: lead.source,
            status: lead.status,
            lead_type: lead.lead_type,
            language: lead.language,
            location: lead.location,
            assigned_to: lead.assigned_to.map(|id| id.to_string()),
            received_at: lead.received_at,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
        }
    }
}

/// Bulk upload outcome
#[derive(Debug, Serialize)]
pub struct BulkLeadsResponse {
    pub inserted: u64,
    pub assigned: usize,
}

impl From<BulkUploadResult> for BulkLeadsResponse {
    fn from(result: BulkUploadResult) -> Self {
        Self {
            inserted: result.inserted,
            assigned: result.assigned,
        }
    }
}

/// One attendance day with derived totals
#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub id: String,
    pub user_id: String,
    pub work_date: NaiveDate,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub breaks: Vec<BreakPeriod>,
    pub status: AttendanceStatus,
    pub worked_minutes: i64,
    pub break_minutes: i64,
}

impl AttendanceResponse {
    /// Totals of an unfinished day run up to `now`.
    pub fn from_record(record: AttendanceRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id.to_string(),
            user_id: record.user_id.to_string(),
            status: record.status(),
            worked_minutes: record.worked_minutes(now),
            break_minutes: record.break_minutes(now),
            work_date: record.work_date,
            check_in: record.check_in,
            check_out: record.check_out,
            breaks: record.breaks,
        }
    }
}

/// `GET /attendance/today`
#[derive(Debug, Serialize)]
pub struct TodayAttendanceResponse {
    pub record: Option<AttendanceResponse>,
    pub status: AttendanceStatus,
    pub worked_minutes: i64,
    pub break_minutes: i64,
}

impl From<TodayAttendance> for TodayAttendanceResponse {
    fn from(today: TodayAttendance) -> Self {
        let now = Utc::now();
        Self {
            record: today
                .record
                .map(|record| AttendanceResponse::from_record(record, now)),
            status: today.status,
            worked_minutes: today.worked_minutes,
            break_minutes: today.break_minutes,
        }
    }
}

/// Activity feed
#[derive(Debug, Serialize)]
pub struct ActivityListResponse {
    pub activities: Vec<Activity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn ids_are_strings() {
        let lead = Lead {
            id: 900719925474099345,
            assigned_to: Some(12),
            ..Lead::default()
        };
        let json = serde_json::to_value(LeadResponse::from(lead)).unwrap();
        assert_eq!(json["id"], "900719925474099345");
        assert_eq!(json["assigned_to"], "12");
        assert_eq!(json["type"], "warm");
    }

    #[test]
    fn employee_response_flattens_user() {
        let overview = EmployeeOverview {
            employee: User {
                id: 3,
                name: "Asha".into(),
                ..User::default()
            },
            assigned_leads: 4,
            closed_leads: 1,
        };
        let json = serde_json::to_value(EmployeeResponse::from(overview)).unwrap();
        assert_eq!(json["id"], "3");
        assert_eq!(json["assigned_leads"], 4);
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn attendance_response_includes_totals() {
        let start = Utc::now() - Duration::minutes(90);
        let record = AttendanceRecord::check_in(1, 2, start);
        let json =
            serde_json::to_value(AttendanceResponse::from_record(record, start + Duration::minutes(90)))
                .unwrap();
        assert_eq!(json["status"], "working");
        assert_eq!(json["worked_minutes"], 90);
    }
}
