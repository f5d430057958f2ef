//! Employee Handlers
//!
//! Admin-only management of employee accounts.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    CreateEmployeeRequest, EmployeeQuery, UpdateEmployeeRequest,
};
use crate::application::dto::response::{EmployeeResponse, UserResponse};
use crate::application::services::{EmployeeService, EmployeeServiceImpl};
use crate::domain::EmployeeFilter;
use crate::infrastructure::repositories::{PgLeadRepository, PgUserRepository};
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::Page;
use crate::startup::AppState;

use super::{activity_service, parse_id};

fn employee_service(state: &AppState) -> EmployeeServiceImpl<PgUserRepository, PgLeadRepository> {
    EmployeeServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgLeadRepository::new(state.db.clone())),
        activity_service(state),
        state.snowflake.clone(),
    )
}

/// List employees with their lead counts
pub async fn list_employees(
    State(state): State<AppState>,
    Query(query): Query<EmployeeQuery>,
) -> Result<Json<Page<EmployeeResponse>>, AppError> {
    let page = query.paging();
    let filter = EmployeeFilter {
        search: query.search,
        status: query.status,
    };

    let employees = employee_service(&state).list(filter, page).await?;
    Ok(Json(employees.map(EmployeeResponse::from)))
}

/// Get one employee
pub async fn get_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_id(&employee_id, "employee")?;
    let user = employee_service(&state).get(id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Create an employee account
pub async fn create_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = employee_service(&state).create(auth.caller(), body).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Update an employee account
pub async fn update_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(employee_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateEmployeeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let id = parse_id(&employee_id, "employee")?;
    let user = employee_service(&state)
        .update(auth.caller(), id, body)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// Delete an employee; their open leads go back to the pool
pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(employee_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&employee_id, "employee")?;
    employee_service(&state).delete(auth.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
