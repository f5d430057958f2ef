//! User Repository Implementation
//!
//! PostgreSQL implementation of the UserRepository trait.
//! Maps between the `users` table and the domain User entity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::{EmployeeFilter, EmployeeOverview, User, UserRepository, UserRole, UserStatus};
use crate::infrastructure::database::conflict_on_unique;
use crate::shared::error::AppError;

const USER_COLUMNS: &str = "id, name, email, password_hash, role, phone, location, language, \
                            status, created_at, updated_at";

/// Database row representation of the users table.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    phone: Option<String>,
    location: Option<String>,
    language: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Convert database row to domain User entity.
    fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role: self.role.parse().unwrap_or(UserRole::Employee),
            phone: self.phone,
            location: self.location,
            language: self.language,
            status: UserStatus::from_db(&self.status),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Employee row joined with lead counts.
#[derive(Debug, sqlx::FromRow)]
struct EmployeeOverviewRow {
    #[sqlx(flatten)]
    user: UserRow,
    assigned_leads: i64,
    closed_leads: i64,
}

/// Append the employee filter to a query that already has a `WHERE` clause.
fn push_employee_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &EmployeeFilter) {
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        builder
            .push(" AND (u.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND u.status = ").push_bind(status.as_str());
    }
}

/// PostgreSQL user repository implementation.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    /// Emails are compared case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, phone, location, language, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(&user.location)
        .bind(&user.language)
        .bind(user.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("A user with this email already exists"))?;

        Ok(row.into_user())
    }

    async fn update(&self, user: &User) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET name = $2,
                email = $3,
                password_hash = $4,
                phone = $5,
                location = $6,
                language = $7,
                status = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(&user.location)
        .bind(&user.language)
        .bind(user.status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_on_unique("A user with this email already exists"))?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))?;

        Ok(row.into_user())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        Ok(())
    }

    async fn list_employees(
        &self,
        filter: &EmployeeFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<EmployeeOverview>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            r#"
            SELECT u.id, u.name, u.email, u.password_hash, u.role, u.phone, u.location,
                   u.language, u.status, u.created_at, u.updated_at,
                   COUNT(l.id) AS assigned_leads,
                   COUNT(l.id) FILTER (WHERE l.status = 'closed') AS closed_leads
            FROM users u
            LEFT JOIN leads l ON l.assigned_to = u.id
            WHERE u.role = 'employee'
            "#,
        );
        push_employee_filter(&mut builder, filter);
        builder
            .push(" GROUP BY u.id ORDER BY u.created_at DESC, u.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<EmployeeOverviewRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| EmployeeOverview {
                employee: r.user.into_user(),
                assigned_leads: r.assigned_leads,
                closed_leads: r.closed_leads,
            })
            .collect())
    }

    async fn count_employees(&self, filter: &EmployeeFilter) -> Result<i64, AppError> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u WHERE u.role = 'employee'");
        push_employee_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn find_active_employees(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE role = 'employee' AND status = 'active' ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    async fn admin_exists(&self) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}
