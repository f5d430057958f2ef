//! Activity Feed Handlers

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{ActivityQuery, CreateActivityRequest};
use crate::application::dto::response::ActivityListResponse;
use crate::application::services::actor_for;
use crate::domain::Activity;
use crate::infrastructure::repositories::PgUserRepository;
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::DEFAULT_PAGE_SIZE;
use crate::startup::AppState;

use super::activity_service;

/// Most recent activities, newest first
pub async fn recent_activities(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityListResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE) as usize;
    let activities = activity_service(&state).recent(limit).await?;
    Ok(Json(ActivityListResponse { activities }))
}

/// Record a custom activity and push it to every connected socket
pub async fn create_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateActivityRequest>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    let users = PgUserRepository::new(state.db.clone());
    let actor = actor_for(&users, &auth.caller()).await;
    let payload = body.into_payload(actor.name.clone());

    let activity = activity_service(&state).record(payload, actor).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}
