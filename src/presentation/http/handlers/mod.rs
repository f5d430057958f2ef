//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod activity;
pub mod attendance;
pub mod auth;
pub mod dashboard;
pub mod employee;
pub mod health;
pub mod lead;

use std::sync::Arc;

use crate::application::services::{ActivityService, ActivityServiceImpl};
use crate::infrastructure::cache::RedisRecentActivities;
use crate::infrastructure::repositories::PgActivityRepository;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Activity service wired to Postgres, the Redis recent list and the socket hub
pub(crate) fn activity_service(state: &AppState) -> Arc<dyn ActivityService> {
    Arc::new(ActivityServiceImpl::new(
        Arc::new(PgActivityRepository::new(state.db.clone())),
        Arc::new(RedisRecentActivities::new(
            state.redis.clone(),
            &state.settings.activity,
        )),
        state.hub.clone(),
        state.snowflake.clone(),
    ))
}

/// Parse a snowflake id taken from the path
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::BadRequest(format!("Invalid {} id", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_garbage() {
        assert_eq!(parse_id("123456789", "lead").unwrap(), 123456789);
        assert!(matches!(
            parse_id("abc", "lead"),
            Err(AppError::BadRequest(msg)) if msg == "Invalid lead id"
        ));
    }
}
