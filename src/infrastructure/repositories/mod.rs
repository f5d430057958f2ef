//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **PgUserRepository** - Admin and employee accounts
//! - **PgLeadRepository** - Leads, bulk import and assignment load
//! - **PgActivityRepository** - Persisted activity feed
//! - **PgAttendanceRepository** - Daily check-in / break / check-out records
//! - **PgSessionRepository** - Refresh-token sessions
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crm_server::infrastructure::repositories::{PgLeadRepository, PgUserRepository};
//!
//! fn setup_repositories(pool: PgPool) {
//!     let users = PgUserRepository::new(pool.clone());
//!     let leads = PgLeadRepository::new(pool);
//! }
//! ```

pub mod activity_repository;
pub mod attendance_repository;
pub mod lead_repository;
pub mod session_repository;
pub mod user_repository;

pub use activity_repository::PgActivityRepository;
pub use attendance_repository::PgAttendanceRepository;
pub use lead_repository::PgLeadRepository;
pub use session_repository::PgSessionRepository;
pub use user_repository::PgUserRepository;
