//! Employee Service
//!
//! Admin-side management of employee accounts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::activity_service::{record_quietly, ActivityService};
use super::auth_service::{hash_password, AuthError};
use super::{actor_for, Caller};
use crate::application::dto::request::{CreateEmployeeRequest, UpdateEmployeeRequest};
use crate::domain::{
    ActivityPayload, EmployeeAdded, EmployeeDeleted, EmployeeFilter, EmployeeOverview,
    EmployeeUpdated, LeadRepository, User, UserRepository, UserRole, UserStatus,
};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, PageParams};
use crate::shared::snowflake::SnowflakeGenerator;

/// Employee service trait
#[async_trait]
pub trait EmployeeService: Send + Sync {
    /// Employees matching the filter, with lead counts
    async fn list(
        &self,
        filter: EmployeeFilter,
        page: PageParams,
    ) -> Result<Page<EmployeeOverview>, EmployeeError>;

    async fn get(&self, id: i64) -> Result<User, EmployeeError>;

    async fn create(
        &self,
        caller: Caller,
        input: CreateEmployeeRequest,
    ) -> Result<User, EmployeeError>;

    async fn update(
        &self,
        caller: Caller,
        id: i64,
        input: UpdateEmployeeRequest,
    ) -> Result<User, EmployeeError>;

    /// Delete an employee, returning their open and ongoing leads to the pool
    async fn delete(&self, caller: Caller, id: i64) -> Result<(), EmployeeError>;
}

/// Employee errors
#[derive(Debug, thiserror::Error)]
pub enum EmployeeError {
    #[error("Employee not found")]
    NotFound,

    #[error("Email already exists")]
    EmailTaken,

    #[error("You cannot delete your own account")]
    CannotDeleteSelf,

    #[error("Admin accounts cannot be deleted")]
    CannotDeleteAdmin,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<EmployeeError> for AppError {
    fn from(err: EmployeeError) -> Self {
        match err {
            EmployeeError::NotFound => AppError::NotFound(err.to_string()),
            EmployeeError::EmailTaken => AppError::Conflict(err.to_string()),
            EmployeeError::CannotDeleteSelf | EmployeeError::CannotDeleteAdmin => {
                AppError::BadRequest(err.to_string())
            }
            EmployeeError::Auth(e) => e.into(),
            EmployeeError::Repository(e) => e,
        }
    }
}

/// Trim an optional text field; blank becomes `None`.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// EmployeeService implementation
pub struct EmployeeServiceImpl<U, L>
where
    U: UserRepository,
    L: LeadRepository,
{
    user_repo: Arc<U>,
    lead_repo: Arc<L>,
    activities: Arc<dyn ActivityService>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<U, L> EmployeeServiceImpl<U, L>
where
    U: UserRepository,
    L: LeadRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        lead_repo: Arc<L>,
        activities: Arc<dyn ActivityService>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            user_repo,
            lead_repo,
            activities,
            id_generator,
        }
    }

    async fn find_employee(&self, id: i64) -> Result<User, EmployeeError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .filter(|u| u.role == UserRole::Employee)
            .ok_or(EmployeeError::NotFound)
    }
}

#[async_trait]
impl<U, L> EmployeeService for EmployeeServiceImpl<U, L>
where
    U: UserRepository + 'static,
    L: LeadRepository + 'static,
{
    async fn list(
        &self,
        filter: EmployeeFilter,
        page: PageParams,
    ) -> Result<Page<EmployeeOverview>, EmployeeError> {
        let items = self
            .user_repo
            .list_employees(&filter, page.offset(), page.limit())
            .await?;
        let total = self.user_repo.count_employees(&filter).await?;
        Ok(Page::new(items, total, page))
    }

    async fn get(&self, id: i64) -> Result<User, EmployeeError> {
        self.find_employee(id).await
    }

    async fn create(
        &self,
        caller: Caller,
        input: CreateEmployeeRequest,
    ) -> Result<User, EmployeeError> {
        let email = input.email.trim().to_lowercase();
        if self.user_repo.email_exists(&email).await? {
            return Err(EmployeeError::EmailTaken);
        }

        let now = Utc::now();
        let employee = User {
            id: self.id_generator.generate(),
            name: input.name.trim().to_string(),
            email,
            password_hash: hash_password(&input.password)?,
            role: UserRole::Employee,
            phone: clean(input.phone),
            location: clean(input.location),
            language: clean(input.language),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let employee = self.user_repo.create(&employee).await?;
        tracing::info!(user_id = employee.id, "Employee created");

        let actor = actor_for(self.user_repo.as_ref(), &caller).await;
        let payload = ActivityPayload::EmployeeAdded(EmployeeAdded {
            employee_name: employee.name.clone(),
            added_by: actor.name.clone(),
        });
        record_quietly(self.activities.as_ref(), payload, actor).await;

        Ok(employee)
    }

    async fn update(
        &self,
        caller: Caller,
        id: i64,
        input: UpdateEmployeeRequest,
    ) -> Result<User, EmployeeError> {
        let mut employee = self.find_employee(id).await?;

        if let Some(email) = input.email {
            let email = email.trim().to_lowercase();
            if !email.eq_ignore_ascii_case(&employee.email) {
                if self.user_repo.email_exists(&email).await? {
                    return Err(EmployeeError::EmailTaken);
                }
                employee.email = email;
            }
        }
        if let Some(name) = input.name {
            employee.name = name.trim().to_string();
        }
        if let Some(password) = input.password {
            employee.password_hash = hash_password(&password)?;
        }
        if input.phone.is_some() {
            employee.phone = clean(input.phone);
        }
        if input.location.is_some() {
            employee.location = clean(input.location);
        }
        if input.language.is_some() {
            employee.language = clean(input.language);
        }
        if let Some(status) = input.status {
            employee.status = status;
        }
        employee.updated_at = Utc::now();

        let employee = self.user_repo.update(&employee).await?;
        tracing::info!(user_id = employee.id, status = %employee.status, "Employee updated");

        let actor = actor_for(self.user_repo.as_ref(), &caller).await;
        let payload = ActivityPayload::EmployeeUpdated(EmployeeUpdated {
            employee_name: employee.name.clone(),
            updated_by: actor.name.clone(),
        });
        record_quietly(self.activities.as_ref(), payload, actor).await;

        Ok(employee)
    }

    async fn delete(&self, caller: Caller, id: i64) -> Result<(), EmployeeError> {
        if id == caller.id {
            return Err(EmployeeError::CannotDeleteSelf);
        }
        let target = self
            .user_repo
            .find_by_id(id)
            .await?
            .ok_or(EmployeeError::NotFound)?;
        if target.is_admin() {
            return Err(EmployeeError::CannotDeleteAdmin);
        }

        let released = self.lead_repo.unassign_active_for(id).await?;
        self.user_repo.delete(id).await?;
        tracing::info!(user_id = id, released_leads = released, "Employee deleted");

        let actor = actor_for(self.user_repo.as_ref(), &caller).await;
        let payload = ActivityPayload::EmployeeDeleted(EmployeeDeleted {
            employee_name: target.name,
            deleted_by: actor.name.clone(),
        });
        record_quietly(self.activities.as_ref(), payload, actor).await;

        Ok(())
    }
}
