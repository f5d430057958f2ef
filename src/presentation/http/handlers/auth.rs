//! Authentication Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{LoginRequest, RefreshTokenRequest};
use crate::application::dto::response::{LoginResponse, TokenResponse, UserResponse};
use crate::application::services::{AuthService, AuthServiceImpl};
use crate::infrastructure::repositories::{PgSessionRepository, PgUserRepository};
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

fn auth_service(state: &AppState) -> AuthServiceImpl<PgUserRepository, PgSessionRepository> {
    AuthServiceImpl::new(
        Arc::new(PgUserRepository::new(state.db.clone())),
        Arc::new(PgSessionRepository::new(state.db.clone())),
        state.snowflake.clone(),
        state.settings.jwt.clone(),
    )
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (user, tokens) = auth_service(&state)
        .login(&body.email, &body.password)
        .await?;

    Ok(Json(LoginResponse {
        user: UserResponse::from(user),
        tokens: TokenResponse::from(tokens),
    }))
}

/// Exchange a refresh token for a new pair
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = auth_service(&state).refresh(&body.refresh_token).await?;
    Ok(Json(TokenResponse::from(tokens)))
}

/// Revoke a refresh token. Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshTokenRequest>,
) -> StatusCode {
    if let Err(e) = auth_service(&state).logout(&body.refresh_token).await {
        tracing::debug!(error = %e, "Logout with unknown session");
    }
    StatusCode::NO_CONTENT
}

/// Current authenticated user
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_service(&state).me(auth.user_id).await?;
    Ok(Json(UserResponse::from(user)))
}
