//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use std::sync::Arc;

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};

use super::handlers;
use crate::config::JwtSettings;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, logging, require_admin};
use crate::presentation::realtime;
use crate::startup::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let jwt = Arc::new(state.settings.jwt.clone());

    Router::new()
        .nest("/api/v1", api_routes(jwt))
        // Realtime activity socket
        .merge(realtime::router())
        .route("/health/ready", get(handlers::health::readiness))
        .merge(probe_routes())
        .route_layer(middleware::from_fn(logging::track_metrics))
        .with_state(state)
}

/// Stateless probes: basic health, liveness and Prometheus metrics
pub fn probe_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/metrics", get(metrics_handler))
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes
fn api_routes(jwt: Arc<JwtSettings>) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .merge(member_routes())
        .merge(admin_routes().route_layer(middleware::from_fn(require_admin)))
        .route_layer(middleware::from_fn_with_state(jwt, auth_middleware));

    Router::new().merge(auth_routes()).merge(protected)
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh_token))
        .route("/auth/logout", post(handlers::auth::logout))
}

/// Routes open to every signed-in user
fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/leads", get(handlers::lead::list_leads))
        .route("/leads/{id}", get(handlers::lead::get_lead))
        .route("/leads/{id}/status", patch(handlers::lead::update_lead_status))
        .route(
            "/activities",
            get(handlers::activity::recent_activities).post(handlers::activity::create_activity),
        )
        .route("/attendance", get(handlers::attendance::my_history))
        .route("/attendance/today", get(handlers::attendance::today))
        .route("/attendance/check-in", post(handlers::attendance::check_in))
        .route("/attendance/check-out", post(handlers::attendance::check_out))
        .route("/attendance/break/start", post(handlers::attendance::start_break))
        .route("/attendance/break/end", post(handlers::attendance::end_break))
}

/// Admin-only routes
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/employees",
            get(handlers::employee::list_employees).post(handlers::employee::create_employee),
        )
        .route(
            "/employees/{id}",
            get(handlers::employee::get_employee)
                .patch(handlers::employee::update_employee)
                .delete(handlers::employee::delete_employee),
        )
        .route("/leads", post(handlers::lead::create_lead))
        .route("/leads/bulk", post(handlers::lead::bulk_create_leads))
        .route(
            "/leads/{id}",
            patch(handlers::lead::update_lead).delete(handlers::lead::delete_lead),
        )
        .route("/leads/{id}/assign", post(handlers::lead::assign_lead))
        .route(
            "/attendance/employees/{id}",
            get(handlers::attendance::employee_history),
        )
        .route("/dashboard/stats", get(handlers::dashboard::stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn liveness_is_public() {
        let response = probe_routes::<()>()
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = probe_routes::<()>()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
