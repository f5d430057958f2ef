//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Login, token rotation, bootstrap admin
//! - **ActivityService**: Persist, cache and broadcast activities
//! - **EmployeeService**: Employee management
//! - **LeadService**: Lead CRUD, bulk upload, assignment and status flow
//! - **AttendanceService**: Check-in, breaks and check-out
//! - **DashboardService**: Aggregate figures for the admin dashboard

pub mod activity_service;
pub mod attendance_service;
pub mod auth_service;
pub mod dashboard_service;
pub mod employee_service;
pub mod lead_service;

use crate::domain::{Activity, Actor, ActorType, UserRepository, UserRole};

pub use activity_service::{ActivityError, ActivityService, ActivityServiceImpl};
pub use attendance_service::{
    AttendanceError, AttendanceService, AttendanceServiceImpl, TodayAttendance,
};
pub use auth_service::{
    decode_access_token, hash_password, AuthError, AuthService, AuthServiceImpl, AuthTokens,
    Claims,
};
pub use dashboard_service::{DashboardService, DashboardServiceImpl, DashboardStats};
pub use employee_service::{EmployeeError, EmployeeService, EmployeeServiceImpl};
pub use lead_service::{BulkUploadResult, LeadError, LeadService, LeadServiceImpl};

#[cfg(test)]
pub use activity_service::MockActivityService;

/// The authenticated user a service call is made on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: UserRole,
}

impl Caller {
    pub fn new(id: i64, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Fan-out for recorded activities. Implemented by the realtime hub.
#[cfg_attr(test, mockall::automock)]
pub trait ActivityBroadcaster: Send + Sync {
    /// Send to every connected socket. Returns the number of receivers.
    fn broadcast_activity(&self, activity: Activity) -> usize;
}

/// Resolve the caller to an activity actor. A failed lookup still yields an
/// actor with the caller's id and role.
pub(crate) async fn actor_for<U: UserRepository + ?Sized>(users: &U, caller: &Caller) -> Actor {
    let name = match users.find_by_id(caller.id).await {
        Ok(user) => user.map(|u| u.name),
        Err(e) => {
            tracing::warn!(user_id = caller.id, error = %e, "Could not load acting user");
            None
        }
    };
    Actor {
        id: Some(caller.id),
        name,
        actor_type: ActorType::from(caller.role),
    }
}
