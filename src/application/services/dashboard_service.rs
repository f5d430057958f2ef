//! Dashboard Service
//!
//! Aggregate figures for the admin dashboard.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use super::activity_service::ActivityService;
use crate::domain::{
    Activity, AttendanceRepository, EmployeeFilter, LeadCounts, LeadRepository, UserRepository,
    UserStatus,
};
use crate::shared::error::AppError;

/// Number of activities shown on the dashboard.
const RECENT_ACTIVITY_COUNT: usize = 10;

#[async_trait]
pub trait DashboardService: Send + Sync {
    /// `connected_sockets` comes from the realtime hub.
    async fn stats(&self, connected_sockets: usize) -> Result<DashboardStats, AppError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub leads: LeadCounts,
    pub total_employees: i64,
    pub active_employees: i64,
    pub checked_in_today: i64,
    pub connected_sockets: usize,
    pub recent_activities: Vec<Activity>,
}

pub struct DashboardServiceImpl<L, U, A>
where
    L: LeadRepository,
    U: UserRepository,
    A: AttendanceRepository,
{
    lead_repo: Arc<L>,
    user_repo: Arc<U>,
    attendance_repo: Arc<A>,
    activities: Arc<dyn ActivityService>,
}

impl<L, U, A> DashboardServiceImpl<L, U, A>
where
    L: LeadRepository,
    U: UserRepository,
    A: AttendanceRepository,
{
    pub fn new(
        lead_repo: Arc<L>,
        user_repo: Arc<U>,
        attendance_repo: Arc<A>,
        activities: Arc<dyn ActivityService>,
    ) -> Self {
        Self {
            lead_repo,
            user_repo,
            attendance_repo,
            activities,
        }
    }
}

#[async_trait]
impl<L, U, A> DashboardService for DashboardServiceImpl<L, U, A>
where
    L: LeadRepository + 'static,
    U: UserRepository + 'static,
    A: AttendanceRepository + 'static,
{
    async fn stats(&self, connected_sockets: usize) -> Result<DashboardStats, AppError> {
        let leads = self.lead_repo.counts().await?;
        let total_employees = self
            .user_repo
            .count_employees(&EmployeeFilter::default())
            .await?;
        let active_employees = self
            .user_repo
            .count_employees(&EmployeeFilter {
                status: Some(UserStatus::Active),
                ..EmployeeFilter::default()
            })
            .await?;
        let checked_in_today = self
            .attendance_repo
            .count_present_on(Utc::now().date_naive())
            .await?;

        // A feed failure degrades to an empty list
        let recent_activities = match self.activities.recent(RECENT_ACTIVITY_COUNT).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load recent activities");
                Vec::new()
            }
        };

        Ok(DashboardStats {
            leads,
            total_employees,
            active_employees,
            checked_in_today,
            connected_sockets,
            recent_activities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{ActivityError, MockActivityService};
    use crate::domain::{MockAttendanceRepository, MockLeadRepository, MockUserRepository};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn gathers_every_figure() {
        let mut leads = MockLeadRepository::new();
        leads.expect_counts().returning(|| {
            Ok(LeadCounts {
                total: 9,
                open: 4,
                ongoing: 3,
                closed: 2,
                unassigned: 1,
                ..LeadCounts::default()
            })
        });
        let mut users = MockUserRepository::new();
        users
            .expect_count_employees()
            .returning(|f| Ok(if f.status.is_some() { 3 } else { 5 }));
        let mut attendance = MockAttendanceRepository::new();
        attendance.expect_count_present_on().returning(|_| Ok(2));
        let mut activities = MockActivityService::new();
        activities
            .expect_recent()
            .with(eq(RECENT_ACTIVITY_COUNT))
            .returning(|_| Err(ActivityError::Repository(AppError::Internal("down".into()))));

        let stats = DashboardServiceImpl::new(
            Arc::new(leads),
            Arc::new(users),
            Arc::new(attendance),
            Arc::new(activities),
        )
        .stats(4)
        .await
        .unwrap();

        assert_eq!(stats.leads.total, 9);
        assert_eq!(stats.total_employees, 5);
        assert_eq!(stats.active_employees, 3);
        assert_eq!(stats.checked_in_today, 2);
        assert_eq!(stats.connected_sockets, 4);
        assert!(stats.recent_activities.is_empty());
    }
}
