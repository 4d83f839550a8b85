use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::company::{Company, RegisterCompanyPayload, UpdateCompanyPayload},
};

const UNIQUE_COMPANY_FIELDS: &[(&str, &str)] = &[
    ("companies_email_key", "A company with this email is already registered."),
    ("companies_phone_key", "A company with this phone number is already registered."),
];

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        payload: &RegisterCompanyPayload,
    ) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, email, phone, gst_number, address)
            VALUES ($1, lower($2), $3, upper($4), $5)
            RETURNING *
            "#,
        )
        .bind(payload.company_name.trim())
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(payload.gst_number.as_deref())
        .bind(payload.address.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, UNIQUE_COMPANY_FIELDS))
    }

    pub async fn update(
        &self,
        id: Uuid,
        payload: &UpdateCompanyPayload,
    ) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                name       = COALESCE($2, name),
                phone      = COALESCE($3, phone),
                gst_number = COALESCE(upper($4), gst_number),
                address    = COALESCE($5, address),
                logo_url   = COALESCE($6, logo_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.name.as_deref())
        .bind(payload.phone.as_deref())
        .bind(payload.gst_number.as_deref())
        .bind(payload.address.as_deref())
        .bind(payload.logo_url.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, UNIQUE_COMPANY_FIELDS))
    }

    /// Next consignment number for the tenant. The row lock taken by the
    /// UPDATE serializes concurrent bookings until the caller's transaction ends.
    pub async fn next_cn_number<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let n = sqlx::query_scalar::<_, i64>(
            "UPDATE companies SET cn_counter = cn_counter + 1 WHERE id = $1 RETURNING cn_counter",
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(n)
    }

    pub async fn next_manifest_number<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let n = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE companies SET manifest_counter = manifest_counter + 1
            WHERE id = $1
            RETURNING manifest_counter
            "#,
        )
        .bind(tenant_id)
        .fetch_one(executor)
        .await?;
        Ok(n)
    }
}
