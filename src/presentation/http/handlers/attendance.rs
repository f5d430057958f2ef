//! Attendance Handlers
//!
//! Check-in, breaks and check-out for the signed-in user, plus history.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;

use crate::application::dto::request::AttendanceRangeQuery;
use crate::application::dto::response::{AttendanceResponse, TodayAttendanceResponse};
use crate::application::services::{AttendanceService, AttendanceServiceImpl};
use crate::domain::AttendanceRecord;
use crate::infrastructure::repositories::{PgAttendanceRepository, PgUserRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::{activity_service, parse_id};

fn attendance_service(
    state: &AppState,
) -> AttendanceServiceImpl<PgAttendanceRepository, PgUserRepository> {
    AttendanceServiceImpl::new(
        Arc::new(PgAttendanceRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        activity_service(state),
        state.snowflake.clone(),
    )
}

fn respond(record: AttendanceRecord) -> Json<AttendanceResponse> {
    Json(AttendanceResponse::from_record(record, Utc::now()))
}

pub async fn check_in(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let record = attendance_service(&state).check_in(auth.caller()).await?;
    Ok(respond(record))
}

pub async fn check_out(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let record = attendance_service(&state).check_out(auth.caller()).await?;
    Ok(respond(record))
}

pub async fn start_break(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let record = attendance_service(&state).start_break(auth.caller()).await?;
    Ok(respond(record))
}

pub async fn end_break(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let record = attendance_service(&state).end_break(auth.caller()).await?;
    Ok(respond(record))
}

/// Today's record and running totals for the signed-in user
pub async fn today(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<TodayAttendanceResponse>, AppError> {
    let today = attendance_service(&state).today(auth.user_id).await?;
    Ok(Json(TodayAttendanceResponse::from(today)))
}

/// Attendance history for the signed-in user
pub async fn my_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(range): Query<AttendanceRangeQuery>,
) -> Result<Json<Vec<AttendanceResponse>>, AppError> {
    history(&state, auth.user_id, range).await
}

/// Attendance history for any employee (admin)
pub async fn employee_history(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
    Query(range): Query<AttendanceRangeQuery>,
) -> Result<Json<Vec<AttendanceResponse>>, AppError> {
    let id = parse_id(&employee_id, "employee")?;
    history(&state, id, range).await
}

async fn history(
    state: &AppState,
    user_id: i64,
    range: AttendanceRangeQuery,
) -> Result<Json<Vec<AttendanceResponse>>, AppError> {
    let records = attendance_service(state)
        .list(user_id, range.from, range.to)
        .await?;
    let now = Utc::now();
    Ok(Json(
        records
            .into_iter()
            .map(|record| AttendanceResponse::from_record(record, now))
            .collect(),
    ))
}
