use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    access::{
        context::AccessContext,
        filter::{Filter, ScopedQuery},
        page::{DateRange, Page, PageRequest, SortOrder},
        visibility::RecordKind,
    },
    common::error::AppError,
    models::customer::{CreateCustomerPayload, Customer, UpdateCustomerPayload},
};

const UNIQUE_CUSTOMER_FIELDS: &[(&str, &str)] = &[(
    "customers_tenant_id_phone_key",
    "A customer with this phone number already exists.",
)];

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        payload: &CreateCustomerPayload,
    ) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (tenant_id, name, phone, email, gst_number, address)
            VALUES ($1, $2, $3, lower($4), upper($5), $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(payload.name.trim())
        .bind(&payload.phone)
        .bind(payload.email.as_deref())
        .bind(payload.gst_number.as_deref())
        .bind(payload.address.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, UNIQUE_CUSTOMER_FIELDS))
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    pub async fn update(
        &self,
        id: Uuid,
        payload: &UpdateCustomerPayload,
    ) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name       = COALESCE($2, name),
                phone      = COALESCE($3, phone),
                email      = COALESCE(lower($4), email),
                gst_number = COALESCE(upper($5), gst_number),
                address    = COALESCE($6, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.name.as_deref())
        .bind(payload.phone.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.gst_number.as_deref())
        .bind(payload.address.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, UNIQUE_CUSTOMER_FIELDS))
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        search: Option<&str>,
        created: DateRange,
        page: PageRequest,
    ) -> Result<Page<Customer>, AppError> {
        ScopedQuery::new("customers", ctx, RecordKind::Customer)
            .filter_opt(search.and_then(|term| {
                Filter::search(&["name", "phone", "email", "gst_number"], term)
            }))
            .date_range("created_at", created)
            .fetch_page(&self.pool, "*", SortOrder::desc("created_at"), page)
            .await
    }
}
