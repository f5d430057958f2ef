//! Lead entity and repository trait.
//!
//! Maps to the `leads` table.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Pipeline stage of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    Open,
    Ongoing,
    Closed,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 3] = [Self::Open, Self::Ongoing, Self::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Ongoing => "ongoing",
            Self::Closed => "closed",
        }
    }

    /// Whether a lead may move from `self` to `next`.
    ///
    /// `closed` is terminal. Setting the current status again is allowed.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        match (self, next) {
            (a, b) if a == b => true,
            (Self::Open, Self::Ongoing) | (Self::Open, Self::Closed) => true,
            (Self::Ongoing, Self::Closed) => true,
            _ => false,
        }
    }

    /// Open and ongoing leads count towards an employee's load.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "ongoing" => Ok(Self::Ongoing),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown lead status '{}'", other)),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Temperature of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeadType {
    Hot,
    #[default]
    Warm,
    Cold,
}

impl LeadType {
    pub const ALL: [LeadType; 3] = [Self::Hot, Self::Warm, Self::Cold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }
}

impl FromStr for LeadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hot" => Ok(Self::Hot),
            "warm" => Ok(Self::Warm),
            "cold" => Ok(Self::Cold),
            other => Err(format!("unknown lead type '{}'", other)),
        }
    }
}

impl fmt::Display for LeadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sales prospect.
///
/// Maps to the `leads` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NOT NULL
/// - email, phone, source, language, location: VARCHAR NULL
/// - status: VARCHAR(16) NOT NULL DEFAULT 'open'
/// - lead_type: VARCHAR(16) NOT NULL DEFAULT 'warm'
/// - assigned_to: BIGINT NULL REFERENCES users(id) ON DELETE SET NULL
/// - received_at, created_at, updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub lead_type: LeadType,
    pub language: Option<String>,
    pub location: Option<String>,
    pub assigned_to: Option<i64>,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn is_assigned_to(&self, user_id: i64) -> bool {
        self.assigned_to == Some(user_id)
    }
}

impl Default for Lead {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: String::new(),
            email: None,
            phone: None,
            source: None,
            status: LeadStatus::Open,
            lead_type: LeadType::Warm,
            language: None,
            location: None,
            assigned_to: None,
            received_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for the lead list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub lead_type: Option<LeadType>,
    /// Restrict to leads assigned to this user
    pub assigned_to: Option<i64>,
    /// Case-insensitive match on name, email or phone
    pub search: Option<String>,
}

/// Lead totals for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeadCounts {
    pub total: i64,
    pub open: i64,
    pub ongoing: i64,
    pub closed: i64,
    pub hot: i64,
    pub warm: i64,
    pub cold: i64,
    pub unassigned: i64,
}

/// Repository trait for Lead data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Lead>, AppError>;

    /// Leads matching `filter`, most recently received first.
    async fn list(&self, filter: &LeadFilter, offset: i64, limit: i64)
        -> Result<Vec<Lead>, AppError>;

    async fn count(&self, filter: &LeadFilter) -> Result<i64, AppError>;

    async fn create(&self, lead: &Lead) -> Result<Lead, AppError>;

    /// Insert all leads in one transaction.
    async fn create_many(&self, leads: &[Lead]) -> Result<u64, AppError>;

    /// Write every field except `status`.
    async fn update(&self, lead: &Lead) -> Result<Lead, AppError>;

    /// Move `id` from `from` to `to`. Returns `None` when the lead is gone or
    /// its status is no longer `from`.
    async fn update_status(
        &self,
        id: i64,
        from: LeadStatus,
        to: LeadStatus,
    ) -> Result<Option<Lead>, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Number of open and ongoing leads per assignee.
    async fn active_load_by_assignee(&self) -> Result<Vec<(i64, i64)>, AppError>;

    /// Detach every open or ongoing lead from `user_id`. Returns the number touched.
    async fn unassign_active_for(&self, user_id: i64) -> Result<u64, AppError>;

    async fn counts(&self) -> Result<LeadCounts, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LeadStatus::Open, LeadStatus::Ongoing, true)]
    #[test_case(LeadStatus::Open, LeadStatus::Closed, true)]
    #[test_case(LeadStatus::Ongoing, LeadStatus::Closed, true)]
    #[test_case(LeadStatus::Ongoing, LeadStatus::Open, false)]
    #[test_case(LeadStatus::Closed, LeadStatus::Open, false)]
    #[test_case(LeadStatus::Closed, LeadStatus::Ongoing, false)]
    #[test_case(LeadStatus::Closed, LeadStatus::Closed, true)]
    fn status_transitions(from: LeadStatus, to: LeadStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn status_and_type_round_trip_through_strings() {
        for status in LeadStatus::ALL {
            assert_eq!(status.as_str().parse::<LeadStatus>(), Ok(status));
        }
        for t in LeadType::ALL {
            assert_eq!(t.as_str().parse::<LeadType>(), Ok(t));
        }
        assert!("lukewarm".parse::<LeadType>().is_err());
    }
}
