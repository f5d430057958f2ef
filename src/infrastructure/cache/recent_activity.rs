//! Recent Activity Cache
//!
//! Keeps the newest activities in a capped Redis list (`LPUSH` + `LTRIM`) so
//! the feed can be served without touching PostgreSQL.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, instrument, warn};

use crate::config::ActivitySettings;
use crate::domain::Activity;
use crate::shared::error::AppError;

/// Store for the most recent activities, newest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecentActivityStore: Send + Sync {
    /// Prepend an activity and trim the list to its capacity.
    async fn push(&self, activity: &Activity) -> Result<(), AppError>;

    /// Up to `limit` activities, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Activity>, AppError>;
}

/// Redis-backed recent activity list.
#[derive(Clone)]
pub struct RedisRecentActivities {
    conn: ConnectionManager,
    key: String,
    capacity: usize,
}

impl RedisRecentActivities {
    pub fn new(conn: ConnectionManager, settings: &ActivitySettings) -> Self {
        Self {
            conn,
            key: settings.recent_cache_key.clone(),
            capacity: settings.recent_cache_size.max(1),
        }
    }
}

#[async_trait]
impl RecentActivityStore for RedisRecentActivities {
    #[instrument(skip(self, activity), fields(activity_id = activity.id), level = "debug")]
    async fn push(&self, activity: &Activity) -> Result<(), AppError> {
        let payload = serde_json::to_string(activity)
            .map_err(|e| AppError::Internal(format!("Serialization error: {}", e)))?;
        let mut conn = self.conn.clone();

        redis::pipe()
            .atomic()
            .lpush(&self.key, payload)
            .ignore()
            .ltrim(&self.key, 0, self.capacity as isize - 1)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;

        debug!(key = %self.key, "Pushed activity to recent list");
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn recent(&self, limit: usize) -> Result<Vec<Activity>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.lrange(&self.key, 0, limit as isize - 1).await?;

        Ok(raw
            .iter()
            .filter_map(|entry| match serde_json::from_str::<Activity>(entry) {
                Ok(activity) => Some(activity),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Skipping unreadable cached activity");
                    None
                }
            })
            .collect())
    }
}
