//! Attendance Repository Implementation
//!
//! PostgreSQL implementation of the AttendanceRepository trait. Breaks are
//! kept in a JSONB column and mapped through `sqlx::types::Json`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{AttendanceRecord, AttendanceRepository, BreakPeriod};
use crate::infrastructure::database::conflict_on_unique;
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct AttendanceRow {
    id: i64,
    user_id: i64,
    work_date: NaiveDate,
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
    breaks: Json<Vec<BreakPeriod>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AttendanceRow {
    fn into_record(self) -> AttendanceRecord {
        AttendanceRecord {
            id: self.id,
            user_id: self.user_id,
            work_date: self.work_date,
            check_in: self.check_in,
            check_out: self.check_out,
            breaks: self.breaks.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL attendance repository implementation.
#[derive(Clone)]
pub struct PgAttendanceRepository {
    pool: PgPool,
}

impl PgAttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    async fn find_for_day(
        &self,
        user_id: i64,
        work_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, work_date, check_in, check_out, breaks, created_at, updated_at
            FROM attendance
            WHERE user_id = $1 AND work_date = $2
            "#,
        )
        .bind(user_id)
        .bind(work_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AttendanceRow::into_record))
    }

    async fn create(&self, record: &AttendanceRecord) -> Result<AttendanceRecord, AppError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            INSERT INTO attendance (id, user_id, work_date, check_in, check_out, breaks)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, work_date, check_in, check_out, breaks, created_at, updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.work_date)
        .bind(record.check_in)
        .bind(record.check_out)
        .bind(Json(&record.breaks))
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("Already checked in today"))?;

        Ok(row.into_record())
    }

    async fn update(&self, record: &AttendanceRecord) -> Result<AttendanceRecord, AppError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            UPDATE attendance
            SET check_out = $2, breaks = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, work_date, check_in, check_out, breaks, created_at, updated_at
            "#,
        )
        .bind(record.id)
        .bind(record.check_out)
        .bind(Json(&record.breaks))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Attendance record {} not found", record.id))
        })?;

        Ok(row.into_record())
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, work_date, check_in, check_out, breaks, created_at, updated_at
            FROM attendance
            WHERE user_id = $1 AND work_date BETWEEN $2 AND $3
            ORDER BY work_date DESC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AttendanceRow::into_record).collect())
    }

    async fn count_present_on(&self, work_date: NaiveDate) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attendance WHERE work_date = $1 AND check_out IS NULL",
        )
        .bind(work_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
