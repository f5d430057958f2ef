//! Activity Service
//!
//! Records activities triggered through the REST API: each one is persisted,
//! pushed to the recent-activity cache and broadcast to every connected socket.

use std::sync::Arc;

use async_trait::async_trait;

use super::ActivityBroadcaster;
use crate::domain::{Activity, ActivityPayload, ActivityRepository, Actor};
use crate::infrastructure::cache::RecentActivityStore;
use crate::shared::error::AppError;
use crate::shared::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::shared::snowflake::SnowflakeGenerator;

/// Activity service trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityService: Send + Sync {
    /// Persist, cache and broadcast a new activity.
    async fn record(&self, payload: ActivityPayload, actor: Actor)
        -> Result<Activity, ActivityError>;

    /// Newest activities first, at most `limit` (clamped to 1..=100).
    async fn recent(&self, limit: usize) -> Result<Vec<Activity>, ActivityError>;
}

/// Activity errors
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<ActivityError> for AppError {
    fn from(err: ActivityError) -> Self {
        match err {
            ActivityError::Repository(e) => e,
        }
    }
}

/// Record an activity as a side effect of another operation. Failures are
/// logged and never surface to the caller.
pub async fn record_quietly(service: &dyn ActivityService, payload: ActivityPayload, actor: Actor) {
    let kind = payload.kind();
    if let Err(e) = service.record(payload, actor).await {
        tracing::error!(event = %kind, error = %e, "Failed to record activity");
    }
}

/// ActivityService implementation
pub struct ActivityServiceImpl<A, C>
where
    A: ActivityRepository,
    C: RecentActivityStore,
{
    activity_repo: Arc<A>,
    recent_store: Arc<C>,
    broadcaster: Arc<dyn ActivityBroadcaster>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<A, C> ActivityServiceImpl<A, C>
where
    A: ActivityRepository,
    C: RecentActivityStore,
{
    pub fn new(
        activity_repo: Arc<A>,
        recent_store: Arc<C>,
        broadcaster: Arc<dyn ActivityBroadcaster>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            activity_repo,
            recent_store,
            broadcaster,
            id_generator,
        }
    }
}

#[async_trait]
impl<A, C> ActivityService for ActivityServiceImpl<A, C>
where
    A: ActivityRepository + 'static,
    C: RecentActivityStore + 'static,
{
    async fn record(
        &self,
        payload: ActivityPayload,
        actor: Actor,
    ) -> Result<Activity, ActivityError> {
        let activity = Activity::new(
            self.id_generator.generate(),
            &payload,
            actor,
            payload.to_data(),
        );
        let activity = self.activity_repo.create(&activity).await?;

        if let Err(e) = self.recent_store.push(&activity).await {
            tracing::warn!(
                activity_id = activity.id,
                error = %e,
                "Could not cache activity"
            );
        }

        let receivers = self.broadcaster.broadcast_activity(activity.clone());
        tracing::debug!(
            activity_id = activity.id,
            event = %activity.kind,
            receivers,
            "Activity recorded"
        );
        Ok(activity)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Activity>, ActivityError> {
        let limit = if limit == 0 {
            DEFAULT_PAGE_SIZE as usize
        } else {
            limit.min(MAX_PAGE_SIZE as usize)
        };

        match self.recent_store.recent(limit).await {
            Ok(cached) if !cached.is_empty() => return Ok(cached),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Recent activity cache unavailable"),
        }

        Ok(self.activity_repo.recent(limit as i64).await?)
    }
}
