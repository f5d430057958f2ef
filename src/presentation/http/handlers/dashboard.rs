//! Dashboard Handler

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::application::services::{DashboardService, DashboardServiceImpl, DashboardStats};
use crate::infrastructure::repositories::{
    PgAttendanceRepository, PgLeadRepository, PgUserRepository,
};
use crate::shared::error::AppError;
use crate::startup::AppState;

use super::activity_service;

/// Aggregate figures for the admin dashboard
pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let service = DashboardServiceImpl::new(
        Arc::new(PgLeadRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgAttendanceRepository::new(state.db.clone())),
        activity_service(&state),
    );

    let stats = service.stats(state.hub.socket_count()).await?;
    Ok(Json(stats))
}
