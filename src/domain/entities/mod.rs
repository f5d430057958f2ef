//! # Domain Entities
//!
//! Core business objects of the CRM. All persisted entities map directly to
//! their database tables.
//!
//! - **User**: admin or employee account
//! - **Lead**: a sales prospect moving through open → ongoing → closed
//! - **Activity**: a human-readable notification of a state change
//! - **AttendanceRecord**: one work day of check-in, breaks and check-out
//! - **Session**: refresh-token session
//!
//! Each entity has an associated repository trait; the PostgreSQL
//! implementations live in the infrastructure layer.

mod activity;
mod attendance;
mod lead;
mod session;
mod user;

pub use activity::{
    Activity, ActivityKind, ActivityPayload, ActivityRepository, Actor, ActorType,
    AttendanceUpdate, CustomActivity, DealClosed, EmployeeAdded, EmployeeDeleted,
    EmployeeUpdated, LeadAssigned, LeadCreated, LeadStatusChanged, LeadsUploaded, PayloadError,
};
pub use attendance::{
    AttendanceAction, AttendanceRecord, AttendanceRepository, AttendanceRuleError,
    AttendanceStatus, BreakPeriod,
};
pub use lead::{Lead, LeadCounts, LeadFilter, LeadRepository, LeadStatus, LeadType};
pub use session::{Session, SessionRepository};
pub use user::{EmployeeFilter, EmployeeOverview, User, UserRepository, UserRole, UserStatus};

#[cfg(test)]
pub use activity::MockActivityRepository;
#[cfg(test)]
pub use attendance::MockAttendanceRepository;
#[cfg(test)]
pub use lead::MockLeadRepository;
#[cfg(test)]
pub use session::MockSessionRepository;
#[cfg(test)]
pub use user::MockUserRepository;
