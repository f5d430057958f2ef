//! Lead Repository Implementation
//!
//! PostgreSQL implementation of the LeadRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::{Lead, LeadCounts, LeadFilter, LeadRepository, LeadStatus};
use crate::shared::error::AppError;

const LEAD_COLUMNS: &str = "id, name, email, phone, source, status, lead_type, language, \
                            location, assigned_to, received_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: i64,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    source: Option<String>,
    status: String,
    lead_type: String,
    language: Option<String>,
    location: Option<String>,
    assigned_to: Option<i64>,
    received_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LeadRow {
    fn into_lead(self) -> Lead {
        Lead {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            source: self.source,
            status: self.status.parse().unwrap_or_default(),
            lead_type: self.lead_type.parse().unwrap_or_default(),
            language: self.language,
            location: self.location,
            assigned_to: self.assigned_to,
            received_at: self.received_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LeadCountsRow {
    total: i64,
    open: i64,
    ongoing: i64,
    closed: i64,
    hot: i64,
    warm: i64,
    cold: i64,
    unassigned: i64,
}

fn push_lead_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &LeadFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(lead_type) = filter.lead_type {
        builder.push(" AND lead_type = ").push_bind(lead_type.as_str());
    }
    if let Some(assignee) = filter.assigned_to {
        builder.push(" AND assigned_to = ").push_bind(assignee);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// PostgreSQL lead repository implementation.
#[derive(Clone)]
pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads WHERE id = $1",
            LEAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LeadRow::into_lead))
    }

    async fn list(
        &self,
        filter: &LeadFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Lead>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM leads WHERE TRUE",
            LEAD_COLUMNS
        ));
        push_lead_filter(&mut builder, filter);
        builder
            .push(" ORDER BY received_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<LeadRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(LeadRow::into_lead).collect())
    }

    async fn count(&self, filter: &LeadFilter) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM leads WHERE TRUE");
        push_lead_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn create(&self, lead: &Lead) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            INSERT INTO leads (id, name, email, phone, source, status, lead_type, language,
                               location, assigned_to, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(lead.lead_type.as_str())
        .bind(&lead.language)
        .bind(&lead.location)
        .bind(lead.assigned_to)
        .bind(lead.received_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_lead())
    }

    async fn create_many(&self, leads: &[Lead]) -> Result<u64, AppError> {
        if leads.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        // Postgres caps bind parameters at 65535; 11 per row keeps chunks well under.
        let mut inserted = 0;
        for chunk in leads.chunks(500) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO leads (id, name, email, phone, source, status, lead_type, language, \
                 location, assigned_to, received_at) ",
            );
            builder.push_values(chunk, |mut row, lead| {
                row.push_bind(lead.id)
                    .push_bind(&lead.name)
                    .push_bind(&lead.email)
                    .push_bind(&lead.phone)
                    .push_bind(&lead.source)
                    .push_bind(lead.status.as_str())
                    .push_bind(lead.lead_type.as_str())
                    .push_bind(&lead.language)
                    .push_bind(&lead.location)
                    .push_bind(lead.assigned_to)
                    .push_bind(lead.received_at);
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn update(&self, lead: &Lead) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            UPDATE leads
            SET name = $2,
                email = $3,
                phone = $4,
                source = $5,
                lead_type = $6,
                language = $7,
                location = $8,
                assigned_to = $9,
                received_at = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.source)
        .bind(lead.lead_type.as_str())
        .bind(&lead.language)
        .bind(&lead.location)
        .bind(lead.assigned_to)
        .bind(lead.received_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead with id {} not found", lead.id)))?;

        Ok(row.into_lead())
    }

    async fn update_status(
        &self,
        id: i64,
        from: LeadStatus,
        to: LeadStatus,
    ) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            UPDATE leads
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LeadRow::into_lead))
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead with id {} not found", id)));
        }

        Ok(())
    }

    async fn active_load_by_assignee(&self) -> Result<Vec<(i64, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT assigned_to, COUNT(*)
            FROM leads
            WHERE assigned_to IS NOT NULL AND status IN ('open', 'ongoing')
            GROUP BY assigned_to
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn unassign_active_for(&self, user_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET assigned_to = NULL, updated_at = NOW()
            WHERE assigned_to = $1 AND status IN ('open', 'ongoing')
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn counts(&self) -> Result<LeadCounts, AppError> {
        let row = sqlx::query_as::<_, LeadCountsRow>(
            r#"
            SELECT COUNT(*)                                          AS total,
                   COUNT(*) FILTER (WHERE status = 'open')           AS open,
                   COUNT(*) FILTER (WHERE status = 'ongoing')        AS ongoing,
                   COUNT(*) FILTER (WHERE status = 'closed')         AS closed,
                   COUNT(*) FILTER (WHERE lead_type = 'hot')         AS hot,
                   COUNT(*) FILTER (WHERE lead_type = 'warm')        AS warm,
                   COUNT(*) FILTER (WHERE lead_type = 'cold')        AS cold,
                   COUNT(*) FILTER (WHERE assigned_to IS NULL)       AS unassigned
            FROM leads
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LeadCounts {
            total: row.total,
            open: row.open,
            ongoing: row.ongoing,
            closed: row.closed,
            hot: row.hot,
            warm: row.warm,
            cold: row.cold,
            unassigned: row.unassigned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LeadStatus, LeadType};

    #[test]
    fn unknown_db_values_fall_back_to_defaults() {
        let now = Utc::now();
        let row = LeadRow {
            id: 1,
            name: "Acme".into(),
            email: None,
            phone: None,
            source: None,
            status: "archived".into(),
            lead_type: "HOT".into(),
            language: None,
            location: None,
            assigned_to: Some(9),
            received_at: now,
            created_at: now,
            updated_at: now,
        };
        let lead = row.into_lead();
        assert_eq!(lead.status, LeadStatus::Open);
        assert_eq!(lead.lead_type, LeadType::Hot);
        assert!(lead.is_assigned_to(9));
    }
}
