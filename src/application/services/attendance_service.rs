//! Attendance Service
//!
//! Daily time tracking: check-in, breaks, check-out and the derived worked
//! and break minutes. Work days are UTC dates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use super::activity_service::{record_quietly, ActivityService};
use super::{actor_for, Caller};
use crate::domain::{
    ActivityPayload, AttendanceAction, AttendanceRecord, AttendanceRepository,
    AttendanceRuleError, AttendanceStatus, AttendanceUpdate, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Longest range a listing may span.
const MAX_RANGE_DAYS: i64 = 366;

/// Default listing window when no `from` is given.
const DEFAULT_RANGE_DAYS: i64 = 30;

/// Attendance service trait
#[async_trait]
pub trait AttendanceService: Send + Sync {
    async fn check_in(&self, caller: Caller) -> Result<AttendanceRecord, AttendanceError>;

    async fn check_out(&self, caller: Caller) -> Result<AttendanceRecord, AttendanceError>;

    async fn start_break(&self, caller: Caller) -> Result<AttendanceRecord, AttendanceError>;

    async fn end_break(&self, caller: Caller) -> Result<AttendanceRecord, AttendanceError>;

    /// Today's record with its status and running totals
    async fn today(&self, user_id: i64) -> Result<TodayAttendance, AttendanceError>;

    /// Records for `user_id` between `from` and `to`, inclusive
    async fn list(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError>;
}

/// Snapshot of the current day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayAttendance {
    pub record: Option<AttendanceRecord>,
    pub status: AttendanceStatus,
    pub worked_minutes: i64,
    pub break_minutes: i64,
}

/// Attendance errors
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error(transparent)]
    Rule(#[from] AttendanceRuleError),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<AttendanceError> for AppError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::Rule(AttendanceRuleError::AlreadyCheckedIn) => {
                AppError::Conflict(err.to_string())
            }
            AttendanceError::Rule(_) | AttendanceError::InvalidRange(_) => {
                AppError::BadRequest(err.to_string())
            }
            AttendanceError::Repository(e) => e,
        }
    }
}

/// AttendanceService implementation
pub struct AttendanceServiceImpl<A, U>
where
    A: AttendanceRepository,
    U: UserRepository,
{
    attendance_repo: Arc<A>,
    user_repo: Arc<U>,
    activities: Arc<dyn ActivityService>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<A, U> AttendanceServiceImpl<A, U>
where
    A: AttendanceRepository,
    U: UserRepository,
{
    pub fn new(
        attendance_repo: Arc<A>,
        user_repo: Arc<U>,
        activities: Arc<dyn ActivityService>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            attendance_repo,
            user_repo,
            activities,
            id_generator,
        }
    }

    async fn today_record(&self, user_id: i64) -> Result<AttendanceRecord, AttendanceError> {
        self.attendance_repo
            .find_for_day(user_id, Utc::now().date_naive())
            .await?
            .ok_or(AttendanceError::Rule(AttendanceRuleError::NotCheckedIn))
    }

    /// Apply a rule to today's record, save it and announce the action.
    async fn transition(
        &self,
        caller: Caller,
        action: AttendanceAction,
        apply: fn(&mut AttendanceRecord) -> Result<(), AttendanceRuleError>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let mut record = self.today_record(caller.id).await?;
        apply(&mut record)?;
        let record = self.attendance_repo.update(&record).await?;
        self.announce(caller, action).await;
        Ok(record)
    }

    async fn announce(&self, caller: Caller, action: AttendanceAction) {
        tracing::info!(user_id = caller.id, action = action.describe(), "Attendance updated");
        let actor = actor_for(self.user_repo.as_ref(), &caller).await;
        let payload = ActivityPayload::AttendanceUpdate(AttendanceUpdate {
            employee_name: actor
                .name
                .clone()
                .unwrap_or_else(|| format!("User {}", caller.id)),
            action,
        });
        record_quietly(self.activities.as_ref(), payload, actor).await;
    }
}

#[async_trait]
impl<A, U> AttendanceService for AttendanceServiceImpl<A, U>
where
    A: AttendanceRepository + 'static,
    U: UserRepository + 'static,
{
    async fn check_in(&self, caller: Caller) -> Result<AttendanceRecord, AttendanceError> {
        let now = Utc::now();
        if self
            .attendance_repo
            .find_for_day(caller.id, now.date_naive())
            .await?
            .is_some()
        {
            return Err(AttendanceRuleError::AlreadyCheckedIn.into());
        }

        let record = AttendanceRecord::check_in(self.id_generator.generate(), caller.id, now);
        let record = match self.attendance_repo.create(&record).await {
            Ok(record) => record,
            // Lost a race with a concurrent check-in
            Err(AppError::Conflict(_)) => {
                return Err(AttendanceRuleError::AlreadyCheckedIn.into())
            }
            Err(e) => return Err(e.into()),
        };
        self.announce(caller, AttendanceAction::CheckIn).await;
        Ok(record)
    }

    async fn check_out(&self, caller: Caller) -> Result<AttendanceRecord, AttendanceError> {
        self.transition(caller, AttendanceAction::CheckOut, |r| r.check_out(Utc::now()))
            .await
    }

    async fn start_break(&self, caller: Caller) -> Result<AttendanceRecord, AttendanceError> {
        self.transition(caller, AttendanceAction::BreakStart, |r| {
            r.start_break(Utc::now())
        })
        .await
    }

    async fn end_break(&self, caller: Caller) -> Result<AttendanceRecord, AttendanceError> {
        self.transition(caller, AttendanceAction::BreakEnd, |r| r.end_break(Utc::now()))
            .await
    }

    async fn today(&self, user_id: i64) -> Result<TodayAttendance, AttendanceError> {
        let now = Utc::now();
        let record = self
            .attendance_repo
            .find_for_day(user_id, now.date_naive())
            .await?;

        Ok(match record {
            Some(record) => TodayAttendance {
                status: record.status(),
                worked_minutes: record.worked_minutes(now),
                break_minutes: record.break_minutes(now),
                record: Some(record),
            },
            None => TodayAttendance {
                record: None,
                status: AttendanceStatus::NotStarted,
                worked_minutes: 0,
                break_minutes: 0,
            },
        })
    }

    async fn list(
        &self,
        user_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let to = to.unwrap_or_else(|| Utc::now().date_naive());
        let from = from.unwrap_or(to - Duration::days(DEFAULT_RANGE_DAYS));
        if from > to {
            return Err(AttendanceError::InvalidRange(
                "'from' must not be after 'to'".into(),
            ));
        }
        if (to - from).num_days() > MAX_RANGE_DAYS {
            return Err(AttendanceError::InvalidRange(format!(
                "range may span at most {} days",
                MAX_RANGE_DAYS
            )));
        }

        Ok(self
            .attendance_repo
            .list_for_user(user_id, from, to)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::MockActivityService;
    use crate::domain::{
        Activity, ActivityKind, MockAttendanceRepository, MockUserRepository, User, UserRole,
    };

    const RAVI: Caller = Caller {
        id: 10,
        role: UserRole::Employee,
    };

    fn users() -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| {
            Ok(Some(User {
                id,
                name: "Ravi".into(),
                ..User::default()
            }))
        });
        users
    }

    fn activities_expecting(action: &'static str) -> MockActivityService {
        let mut activities = MockActivityService::new();
        activities
            .expect_record()
            .times(1)
            .withf(move |p, _| {
                p.kind() == ActivityKind::AttendanceUpdate && p.to_data()["action"] == action
            })
            .returning(|p, a| Ok(Activity::new(1, &p, a, p.to_data())));
        activities
    }

    fn service(
        attendance: MockAttendanceRepository,
        activities: MockActivityService,
    ) -> AttendanceServiceImpl<MockAttendanceRepository, MockUserRepository> {
        AttendanceServiceImpl::new(
            Arc::new(attendance),
            Arc::new(users()),
            Arc::new(activities),
            Arc::new(SnowflakeGenerator::new(2, 2)),
        )
    }

    fn started_an_hour_ago() -> AttendanceRecord {
        AttendanceRecord::check_in(7, RAVI.id, Utc::now() - Duration::hours(1))
    }

    #[tokio::test]
    async fn check_in_creates_record() {
        let mut attendance = MockAttendanceRepository::new();
        attendance.expect_find_for_day().returning(|_, _| Ok(None));
        attendance
            .expect_create()
            .times(1)
            .withf(|r| r.user_id == 10 && r.check_out.is_none())
            .returning(|r| Ok(r.clone()));

        let record = service(attendance, activities_expecting("check_in"))
            .check_in(RAVI)
            .await
            .unwrap();
        assert_eq!(record.status(), AttendanceStatus::Working);
    }

    #[tokio::test]
    async fn second_check_in_conflicts() {
        let mut attendance = MockAttendanceRepository::new();
        attendance
            .expect_find_for_day()
            .returning(|_, _| Ok(Some(started_an_hour_ago())));
        attendance.expect_create().never();

        let err = service(attendance, MockActivityService::new())
            .check_in(RAVI)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn racing_check_in_conflicts() {
        let mut attendance = MockAttendanceRepository::new();
        attendance.expect_find_for_day().returning(|_, _| Ok(None));
        attendance
            .expect_create()
            .returning(|_| Err(AppError::Conflict("Already checked in today".into())));

        let err = service(attendance, MockActivityService::new())
            .check_in(RAVI)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::Rule(AttendanceRuleError::AlreadyCheckedIn)
        ));
    }

    #[tokio::test]
    async fn break_then_check_out() {
        let mut attendance = MockAttendanceRepository::new();
        attendance
            .expect_find_for_day()
            .returning(|_, _| Ok(Some(started_an_hour_ago())));
        attendance.expect_update().returning(|r| Ok(r.clone()));

        let on_break = service(attendance, activities_expecting("break_start"))
            .start_break(RAVI)
            .await
            .unwrap();
        assert_eq!(on_break.status(), AttendanceStatus::OnBreak);
    }

    #[tokio::test]
    async fn check_out_without_check_in_is_rejected() {
        let mut attendance = MockAttendanceRepository::new();
        attendance.expect_find_for_day().returning(|_, _| Ok(None));
        attendance.expect_update().never();

        let err = service(attendance, MockActivityService::new())
            .check_out(RAVI)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::Rule(AttendanceRuleError::NotCheckedIn)
        ));
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn end_break_without_open_break_is_rejected() {
        let mut attendance = MockAttendanceRepository::new();
        attendance
            .expect_find_for_day()
            .returning(|_, _| Ok(Some(started_an_hour_ago())));
        attendance.expect_update().never();

        let err = service(attendance, MockActivityService::new())
            .end_break(RAVI)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::Rule(AttendanceRuleError::NoOpenBreak)
        ));
    }

    #[tokio::test]
    async fn today_reports_running_totals() {
        let mut attendance = MockAttendanceRepository::new();
        attendance
            .expect_find_for_day()
            .returning(|_, _| Ok(Some(started_an_hour_ago())));

        let today = service(attendance, MockActivityService::new())
            .today(RAVI.id)
            .await
            .unwrap();
        assert_eq!(today.status, AttendanceStatus::Working);
        assert!((59..=61).contains(&today.worked_minutes));
        assert_eq!(today.break_minutes, 0);
    }

    #[tokio::test]
    async fn today_without_record_is_not_started() {
        let mut attendance = MockAttendanceRepository::new();
        attendance.expect_find_for_day().returning(|_, _| Ok(None));

        let today = service(attendance, MockActivityService::new())
            .today(RAVI.id)
            .await
            .unwrap();
        assert_eq!(today.status, AttendanceStatus::NotStarted);
        assert!(today.record.is_none());
    }

    #[tokio::test]
    async fn list_validates_range() {
        let mut attendance = MockAttendanceRepository::new();
        attendance
            .expect_list_for_user()
            .withf(|_, from, to| (*to - *from).num_days() == 30)
            .returning(|_, _, _| Ok(vec![]));
        let svc = service(attendance, MockActivityService::new());

        assert!(svc.list(10, None, None).await.unwrap().is_empty());

        let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
        assert!(matches!(
            svc.list(10, Some(day(10)), Some(day(1))).await,
            Err(AttendanceError::InvalidRange(_))
        ));
    }
}
