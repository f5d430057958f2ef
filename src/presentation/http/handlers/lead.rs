//! Lead Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AssignLeadRequest, BulkLeadsRequest, CreateLeadRequest, LeadQuery, UpdateLeadRequest,
    UpdateLeadStatusRequest,
};
use crate::application::dto::response::{BulkLeadsResponse, LeadResponse};
use crate::application::services::{LeadService, LeadServiceImpl};
use crate::domain::LeadFilter;
use crate::infrastructure::repositories::{PgLeadRepository, PgUserRepository};
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::Page;
use crate::startup::AppState;

use super::{activity_service, parse_id};

fn lead_service(state: &AppState) -> LeadServiceImpl<PgLeadRepository, PgUserRepository> {
    LeadServiceImpl::new(
        Arc::new(PgLeadRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        activity_service(state),
        state.snowflake.clone(),
    )
}

/// List leads. Employees only see leads assigned to them.
pub async fn list_leads(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<LeadQuery>,
) -> Result<Json<Page<LeadResponse>>, AppError> {
    let page = query.paging();
    let filter = LeadFilter {
        status: query.status,
        lead_type: query.lead_type,
        assigned_to: None,
        search: query.search,
    };

    let leads = lead_service(&state)
        .list(auth.caller(), filter, page)
        .await?;
    Ok(Json(leads.map(LeadResponse::from)))
}

/// Get one lead
pub async fn get_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadResponse>, AppError> {
    let id = parse_id(&lead_id, "lead")?;
    let lead = lead_service(&state).get(auth.caller(), id).await?;
    Ok(Json(LeadResponse::from(lead)))
}

/// Create a single lead
pub async fn create_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateLeadRequest>,
) -> Result<(StatusCode, Json<LeadResponse>), AppError> {
    let lead = lead_service(&state).create(auth.caller(), body).await?;
    Ok((StatusCode::CREATED, Json(LeadResponse::from(lead))))
}

/// Upload a batch of leads
pub async fn bulk_create_leads(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<BulkLeadsRequest>,
) -> Result<(StatusCode, Json<BulkLeadsResponse>), AppError> {
    let result = lead_service(&state).bulk_create(auth.caller(), body).await?;
    Ok((StatusCode::CREATED, Json(BulkLeadsResponse::from(result))))
}

/// Update lead details
pub async fn update_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(lead_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateLeadRequest>,
) -> Result<Json<LeadResponse>, AppError> {
    let id = parse_id(&lead_id, "lead")?;
    let lead = lead_service(&state).update(auth.caller(), id, body).await?;
    Ok(Json(LeadResponse::from(lead)))
}

/// Delete a lead
pub async fn delete_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(lead_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&lead_id, "lead")?;
    lead_service(&state).delete(auth.caller(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Assign a lead to an employee
pub async fn assign_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(lead_id): Path<String>,
    ValidatedJson(body): ValidatedJson<AssignLeadRequest>,
) -> Result<Json<LeadResponse>, AppError> {
    let id = parse_id(&lead_id, "lead")?;
    let lead = lead_service(&state)
        .assign(auth.caller(), id, body.employee_id)
        .await?;
    Ok(Json(LeadResponse::from(lead)))
}

/// Move a lead through its status flow
pub async fn update_lead_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(lead_id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateLeadStatusRequest>,
) -> Result<Json<LeadResponse>, AppError> {
    let id = parse_id(&lead_id, "lead")?;
    let lead = lead_service(&state)
        .update_status(auth.caller(), id, body.status)
        .await?;
    Ok(Json(LeadResponse::from(lead)))
}
