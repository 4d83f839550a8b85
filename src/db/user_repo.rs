use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    access::{
        context::AccessContext,
        filter::{Filter, ScopedQuery},
        page::{Page, PageRequest, SortOrder},
        role::Role,
        visibility::RecordKind,
    },
    common::error::AppError,
    models::auth::{OtpCode, User},
};

const UNIQUE_USER_FIELDS: &[(&str, &str)] = &[
    ("users_email_key", "A user with this email already exists."),
    ("users_phone_key", "A user with this phone number already exists."),
];

#[derive(Debug, Default)]
pub struct UserFilters {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub tenant_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

#[derive(Debug, Default)]
pub struct UserChanges<'a> {
    pub full_name: Option<&'a str>,
    pub role: Option<Role>,
    /// `Some(None)` unassigns the branch.
    pub branch_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Login lookup. Emails are unique across tenants.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Unscoped primary-key read; pass the result through `AccessContext::admit`.
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn create<'e, E>(&self, executor: E, new: NewUser<'_>) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (tenant_id, branch_id, full_name, email, phone, password_hash, role)
            VALUES ($1, $2, $3, lower($4), $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.tenant_id)
        .bind(new.branch_id)
        .bind(new.full_name)
        .bind(new.email)
        .bind(new.phone)
        .bind(new.password_hash)
        .bind(new.role)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, UNIQUE_USER_FIELDS))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: UserChanges<'_>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (set_branch, branch_id) = match changes.branch_id {
            Some(branch) => (true, branch),
            None => (false, None),
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name  = COALESCE($2, full_name),
                role       = COALESCE($3, role),
                branch_id  = CASE WHEN $4 THEN $5 ELSE branch_id END,
                is_active  = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.full_name)
        .bind(changes.role)
        .bind(set_branch)
        .bind(branch_id)
        .bind(changes.is_active)
        .fetch_one(executor)
        .await?;
        Ok(user)
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        filters: UserFilters,
        page: PageRequest,
    ) -> Result<Page<User>, AppError> {
        ScopedQuery::new("users", ctx, RecordKind::User)
            .filter_opt(
                filters
                    .search
                    .as_deref()
                    .and_then(|term| Filter::search(&["full_name", "email", "phone"], term)),
            )
            .filter_opt(filters.role.map(|role| Filter::eq("role", role.as_str())))
            .filter_opt(filters.branch_id.map(|id| Filter::eq("branch_id", id)))
            .fetch_page(&self.pool, "*", SortOrder::asc("full_name"), page)
            .await
    }

    // --- One-time codes ---

    /// Stores a new code and retires any still-pending ones for the user.
    pub async fn replace_otp<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            WITH retired AS (
                UPDATE otp_codes SET consumed_at = NOW()
                WHERE user_id = $1 AND consumed_at IS NULL
            )
            INSERT INTO otp_codes (user_id, code_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .bind(expires_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Latest unconsumed, unexpired code, locked for the verification attempt.
    pub async fn pending_otp_for_update<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<OtpCode>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let otp = sqlx::query_as::<_, OtpCode>(
            r#"
            SELECT id, user_id, code_hash, attempts, expires_at
            FROM otp_codes
            WHERE user_id = $1 AND consumed_at IS NULL AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(otp)
    }

    pub async fn record_otp_attempt<'e, E>(&self, executor: E, otp_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE otp_codes SET attempts = attempts + 1 WHERE id = $1")
            .bind(otp_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn consume_otp<'e, E>(&self, executor: E, otp_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE otp_codes SET consumed_at = NOW() WHERE id = $1")
            .bind(otp_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
