use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    access::{
        context::AccessContext,
        page::{DateRange, Page, PageRequest},
    },
    common::error::AppError,
    db::CustomerRepository,
    models::customer::{CreateCustomerPayload, Customer, CustomerListQuery, UpdateCustomerPayload},
};

#[derive(Clone)]
pub struct CustomerService {
    customer_repo: CustomerRepository,
    pool: PgPool,
}

impl CustomerService {
    pub fn new(customer_repo: CustomerRepository, pool: PgPool) -> Self {
        Self { customer_repo, pool }
    }

    pub async fn create(
        &self,
        ctx: &AccessContext,
        payload: CreateCustomerPayload,
    ) -> Result<Customer, AppError> {
        let customer = self.customer_repo.create(ctx.tenant_id, &payload).await?;
        tracing::info!(tenant_id = %ctx.tenant_id, customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    pub async fn get(&self, ctx: &AccessContext, id: Uuid) -> Result<Customer, AppError> {
        let customer = self.customer_repo.find_by_id(&self.pool, id).await?;
        ctx.admit(customer)
    }

    pub async fn update(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        payload: UpdateCustomerPayload,
    ) -> Result<Customer, AppError> {
        let existing = self.customer_repo.find_by_id(&self.pool, id).await?;
        let customer = ctx.admit(existing)?;
        self.customer_repo.update(customer.id, &payload).await
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        query: CustomerListQuery,
    ) -> Result<Page<Customer>, AppError> {
        let page = PageRequest::new(query.page, query.limit)?;
        let created = DateRange::new(query.from_date, query.to_date)?;
        self.customer_repo
            .list(ctx, query.search.as_deref(), created, page)
            .await
    }
}
