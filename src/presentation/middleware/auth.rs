//! Authentication Middleware
//!
//! JWT validation for protected routes and the admin gate.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::application::services::{decode_access_token, AuthError, Caller};
use crate::config::JwtSettings;
use crate::domain::UserRole;
use crate::shared::error::AppError;

/// Authenticated user extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn caller(&self) -> Caller {
        Caller::new(self.user_id, self.role)
    }
}

/// Validates the bearer token and stores [`AuthUser`] in the request extensions
pub async fn auth_middleware(
    State(jwt): State<Arc<JwtSettings>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::Unauthorized("Missing or invalid authorization header".into()))?;

    let claims = decode_access_token(bearer.token(), &jwt.secret)?;
    let user_id = claims
        .user_id()
        .map_err(|_| AppError::from(AuthError::InvalidToken))?;

    parts.extensions.insert(AuthUser {
        user_id,
        role: claims.role,
    });

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Rejects non-admin users. Must run after [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    if !user.is_admin() {
        tracing::debug!(user_id = user.user_id, "Admin route refused");
        return Err(AppError::Forbidden("Admin access required".into()));
    }

    Ok(next.run(request).await)
}
