//! User entity and repository trait.
//!
//! Maps to the `users` table. Admins and employees share the table and are
//! told apart by `role`; the employee endpoints only ever touch `employee` rows.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Employee,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "employee" => Ok(Self::Employee),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an account may log in and receive leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    /// Convert from database string representation.
    pub fn from_db(s: &str) -> Self {
        match s {
            "inactive" => Self::Inactive,
            _ => Self::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user account (admin or employee).
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NOT NULL
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - password_hash: VARCHAR(255) NOT NULL
/// - role: VARCHAR(16) NOT NULL
/// - phone, location, language: VARCHAR NULL
/// - status: VARCHAR(16) NOT NULL DEFAULT 'active'
/// - created_at, updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: String::new(),
            email: String::new(),
            password_hash: String::new(),
            role: UserRole::Employee,
            phone: None,
            location: None,
            language: None,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Filter for the employee list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeFilter {
    /// Case-insensitive match on name or email
    pub search: Option<String>,
    pub status: Option<UserStatus>,
}

/// An employee with their lead counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeOverview {
    #[serde(flatten)]
    pub employee: User,
    pub assigned_leads: i64,
    pub closed_leads: i64,
}

/// Repository trait for User data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    async fn create(&self, user: &User) -> Result<User, AppError>;

    async fn update(&self, user: &User) -> Result<User, AppError>;

    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Employees matching `filter`, newest first, with lead counts.
    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<EmployeeOverview>, AppError>;

    async fn count_employees(&self, filter: &EmployeeFilter) -> Result<i64, AppError>;

    /// Active employees, used as assignment candidates.
    async fn find_active_employees(&self) -> Result<Vec<User>, AppError>;

    async fn admin_exists(&self) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            password_hash: "$argon2id$secret".into(),
            ..User::default()
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!("employee".parse::<UserRole>(), Ok(UserRole::Employee));
        assert!("manager".parse::<UserRole>().is_err());
    }

    #[test]
    fn overview_flattens_employee_fields() {
        let overview = EmployeeOverview {
            employee: User {
                id: 7,
                name: "Asha".into(),
                ..User::default()
            },
            assigned_leads: 3,
            closed_leads: 1,
        };
        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["name"], "Asha");
        assert_eq!(json["assigned_leads"], 3);
        assert_eq!(json["role"], "employee");
    }
}
