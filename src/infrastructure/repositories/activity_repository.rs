//! Activity Repository Implementation
//!
//! PostgreSQL implementation of the ActivityRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Activity, ActivityKind, ActivityRepository, ActorType};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: i64,
    kind: String,
    message: String,
    actor_id: Option<i64>,
    actor_name: Option<String>,
    actor_type: String,
    data: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl ActivityRow {
    fn into_activity(self) -> Activity {
        Activity {
            id: self.id,
            kind: ActivityKind::from_event(&self.kind).unwrap_or(ActivityKind::NewActivity),
            message: self.message,
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            actor_type: ActorType::from_db(&self.actor_type),
            data: self.data,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL activity repository implementation.
#[derive(Clone)]
pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn create(&self, activity: &Activity) -> Result<Activity, AppError> {
        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            INSERT INTO activities (id, kind, message, actor_id, actor_name, actor_type, data, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, kind, message, actor_id, actor_name, actor_type, data, created_at
            "#,
        )
        .bind(activity.id)
        .bind(activity.kind.as_str())
        .bind(&activity.message)
        .bind(activity.actor_id)
        .bind(&activity.actor_name)
        .bind(activity.actor_type.as_str())
        .bind(&activity.data)
        .bind(activity.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_activity())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Activity>, AppError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, kind, message, actor_id, actor_name, actor_type, data, created_at
            FROM activities
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ActivityRow::into_activity).collect())
    }
}
