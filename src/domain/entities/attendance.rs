//! Attendance (time tracking) entity and repository trait.
//!
//! One record per user per UTC work day. Breaks are stored inline as a JSON
//! list; at most one break (the last) may be open.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// A break within a work day. `end` is `None` while the break is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPeriod {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl BreakPeriod {
    fn minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end.unwrap_or(now);
        (end - self.start).num_minutes().max(0)
    }
}

/// Where a user stands for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    NotStarted,
    Working,
    OnBreak,
    CheckedOut,
}

/// The four time-tracking actions, also used in `attendance_update` activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceAction {
    CheckIn,
    CheckOut,
    BreakStart,
    BreakEnd,
}

impl AttendanceAction {
    /// Verb phrase used in activity messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::CheckIn => "checked in",
            Self::CheckOut => "checked out",
            Self::BreakStart => "started a break",
            Self::BreakEnd => "ended a break",
        }
    }
}

/// Rule violations for time-tracking actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AttendanceRuleError {
    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("Not checked in today")]
    NotCheckedIn,

    #[error("Already checked out today")]
    AlreadyCheckedOut,

    #[error("A break is already in progress")]
    BreakInProgress,

    #[error("No break in progress")]
    NoOpenBreak,
}

/// Maps to the `attendance` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - user_id: BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// - work_date: DATE NOT NULL, UNIQUE (user_id, work_date)
/// - check_in: TIMESTAMPTZ NOT NULL
/// - check_out: TIMESTAMPTZ NULL
/// - breaks: JSONB NOT NULL DEFAULT '[]'
/// - created_at, updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    pub work_date: NaiveDate,
    pub check_in: DateTime<Utc>,
    pub check_out: Option<DateTime<Utc>>,
    pub breaks: Vec<BreakPeriod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Start a new work day at `now`.
    pub fn check_in(id: i64, user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            work_date: now.date_naive(),
            check_in: now,
            check_out: None,
            breaks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn open_break(&self) -> Option<&BreakPeriod> {
        self.breaks.last().filter(|b| b.end.is_none())
    }

    pub fn status(&self) -> AttendanceStatus {
        if self.check_out.is_some() {
            AttendanceStatus::CheckedOut
        } else if self.open_break().is_some() {
            AttendanceStatus::OnBreak
        } else {
            AttendanceStatus::Working
        }
    }

    /// End the day. A running break is closed at the same instant.
    pub fn check_out(&mut self, now: DateTime<Utc>) -> Result<(), AttendanceRuleError> {
        if self.check_out.is_some() {
            return Err(AttendanceRuleError::AlreadyCheckedOut);
        }
        if let Some(open) = self.breaks.last_mut().filter(|b| b.end.is_none()) {
            open.end = Some(now);
        }
        self.check_out = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn start_break(&mut self, now: DateTime<Utc>) -> Result<(), AttendanceRuleError> {
        if self.check_out.is_some() {
            return Err(AttendanceRuleError::AlreadyCheckedOut);
        }
        if self.open_break().is_some() {
            return Err(AttendanceRuleError::BreakInProgress);
        }
        self.breaks.push(BreakPeriod {
            start: now,
            end: None,
        });
        self.updated_at = now;
        Ok(())
    }

    pub fn end_break(&mut self, now: DateTime<Utc>) -> Result<(), AttendanceRuleError> {
        let open = self
            .breaks
            .last_mut()
            .filter(|b| b.end.is_none())
            .ok_or(AttendanceRuleError::NoOpenBreak)?;
        open.end = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Total break time; a running break counts up to `now`.
    pub fn break_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.breaks.iter().map(|b| b.minutes(now)).sum()
    }

    /// Time between check-in and check-out (or `now`) minus breaks, never negative.
    pub fn worked_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.check_out.unwrap_or(now);
        let span = (end - self.check_in).num_minutes();
        (span - self.break_minutes(now)).max(0)
    }
}

/// Repository trait for attendance records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn find_for_day(
        &self,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError>;

    /// Insert a new day. Fails with `Conflict` if the user already has one.
    async fn create(&self, record: &AttendanceRecord) -> Result<AttendanceRecord, AppError>;

    async fn update(&self, record: &AttendanceRecord) -> Result<AttendanceRecord, AppError>;

    /// Records in `[from, to]`, newest day first.
    async fn list_for_user(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError>;

    /// Users with a record on `work_date` and no check-out yet.
    async fn count_present_on(&self, work_date: NaiveDate) -> Result<i64, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn full_day_subtracts_breaks() {
        let mut day = AttendanceRecord::check_in(1, 7, at(9, 0));
        day.start_break(at(12, 0)).unwrap();
        day.end_break(at(12, 45)).unwrap();
        day.check_out(at(17, 30)).unwrap();

        assert_eq!(day.status(), AttendanceStatus::CheckedOut);
        assert_eq!(day.break_minutes(at(20, 0)), 45);
        assert_eq!(day.worked_minutes(at(20, 0)), 8 * 60 + 30 - 45);
    }

    #[test]
    fn open_break_counts_up_to_now() {
        let mut day = AttendanceRecord::check_in(1, 7, at(9, 0));
        day.start_break(at(10, 0)).unwrap();

        assert_eq!(day.status(), AttendanceStatus::OnBreak);
        assert_eq!(day.break_minutes(at(10, 20)), 20);
        assert_eq!(day.worked_minutes(at(10, 20)), 60);
    }

    #[test]
    fn check_out_closes_running_break() {
        let mut day = AttendanceRecord::check_in(1, 7, at(9, 0));
        day.start_break(at(16, 0)).unwrap();
        day.check_out(at(16, 30)).unwrap();

        assert_eq!(day.breaks[0].end, Some(at(16, 30)));
        assert_eq!(day.worked_minutes(at(23, 0)), 7 * 60);
    }

    #[test]
    fn rules_reject_invalid_sequences() {
        let mut day = AttendanceRecord::check_in(1, 7, at(9, 0));
        assert_eq!(day.end_break(at(9, 5)), Err(AttendanceRuleError::NoOpenBreak));
        day.start_break(at(9, 10)).unwrap();
        assert_eq!(
            day.start_break(at(9, 11)),
            Err(AttendanceRuleError::BreakInProgress)
        );
        day.check_out(at(10, 0)).unwrap();
        assert_eq!(
            day.check_out(at(10, 1)),
            Err(AttendanceRuleError::AlreadyCheckedOut)
        );
        assert_eq!(
            day.start_break(at(10, 2)),
            Err(AttendanceRuleError::AlreadyCheckedOut)
        );
    }

    #[test]
    fn worked_minutes_never_negative() {
        let day = AttendanceRecord::check_in(1, 7, at(9, 0));
        assert_eq!(day.worked_minutes(at(9, 0) - Duration::minutes(5)), 0);
    }
}
