//! Cache Module
//!
//! Redis connection management and the recent-activity list.
//!
//! ```text
//! +-----------------------+
//! |    ActivityService    |
//! +-----------------------+
//!            |
//!            v
//! +-----------------------+
//! |  RecentActivityStore  |  <-- Abstract interface
//! +-----------------------+
//!            |
//!            v
//! +-----------------------+
//! | RedisRecentActivities |  <-- LPUSH + LTRIM list
//! +-----------------------+
//!            |
//!            v
//! +-----------------------+
//! |   ConnectionManager   |  <-- Auto-reconnecting connection
//! +-----------------------+
//! ```

mod recent_activity;

pub use recent_activity::{RecentActivityStore, RedisRecentActivities};

#[cfg(test)]
pub use recent_activity::MockRecentActivityStore;

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Errors
/// Returns `redis::RedisError` if the URL is invalid or the first connection fails.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}
