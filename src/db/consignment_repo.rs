use chrono::NaiveDate;
use rust_decimal::Decimal;
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
    models::consignment::{
        Consignment, ConsignmentStatus, PaymentMode, TrackingEvent, UpdateConsignmentPayload,
    },
};

pub const SEARCH_COLUMNS: &[&str] = &[
    "cn_number",
    "consignor_name",
    "consignor_phone",
    "consignee_name",
    "consignee_phone",
];

#[derive(Debug, Default)]
pub struct ConsignmentFilters {
    pub booked: DateRange,
    pub search: Option<String>,
    pub status: Option<ConsignmentStatus>,
    pub from_branch_id: Option<Uuid>,
    pub to_branch_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct NewConsignment<'a> {
    pub tenant_id: Uuid,
    pub cn_number: i64,
    pub booking_date: NaiveDate,
    pub from_branch_id: Uuid,
    pub to_branch_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub consignor_name: &'a str,
    pub consignor_phone: &'a str,
    pub consignee_name: &'a str,
    pub consignee_phone: &'a str,
    pub consignee_address: Option<&'a str>,
    pub description: Option<&'a str>,
    pub packages: i32,
    pub weight_kg: Decimal,
    pub freight_amount: Decimal,
    pub payment_mode: PaymentMode,
    pub created_by: Uuid,
}

#[derive(Debug)]
pub struct NewTrackingEvent<'a> {
    pub tenant_id: Uuid,
    pub status: ConsignmentStatus,
    pub branch_id: Option<Uuid>,
    pub remarks: Option<&'a str>,
    pub created_by: Uuid,
}

#[derive(Clone)]
pub struct ConsignmentRepository {
    pool: PgPool,
}

impl ConsignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        new: NewConsignment<'_>,
    ) -> Result<Consignment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // A fresh booking sits at its origin.
        let consignment = sqlx::query_as::<_, Consignment>(
            r#"
            INSERT INTO consignments (
                tenant_id, cn_number, booking_date,
                from_branch_id, to_branch_id, current_branch_id, customer_id,
                consignor_name, consignor_phone,
                consignee_name, consignee_phone, consignee_address,
                description, packages, weight_kg, freight_amount, payment_mode,
                status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $4, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, 'booked', $17)
            RETURNING *
            "#,
        )
        .bind(new.tenant_id)
        .bind(new.cn_number)
        .bind(new.booking_date)
        .bind(new.from_branch_id)
        .bind(new.to_branch_id)
        .bind(new.customer_id)
        .bind(new.consignor_name)
        .bind(new.consignor_phone)
        .bind(new.consignee_name)
        .bind(new.consignee_phone)
        .bind(new.consignee_address)
        .bind(new.description)
        .bind(new.packages)
        .bind(new.weight_kg)
        .bind(new.freight_amount)
        .bind(new.payment_mode)
        .bind(new.created_by)
        .fetch_one(executor)
        .await?;
        Ok(consignment)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Consignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let consignment =
            sqlx::query_as::<_, Consignment>("SELECT * FROM consignments WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(consignment)
    }

    /// Same as [`Self::find_by_id`] but holds the row lock until the
    /// surrounding transaction ends.
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Consignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let consignment = sqlx::query_as::<_, Consignment>(
            "SELECT * FROM consignments WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(consignment)
    }

    /// Locks every listed consignment of the tenant, in id order.
    pub async fn lock_many<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Consignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Consignment>(
            r#"
            SELECT * FROM consignments
            WHERE tenant_id = $1 AND id = ANY($2)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn update_details<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &UpdateConsignmentPayload,
    ) -> Result<Consignment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let consignment = sqlx::query_as::<_, Consignment>(
            r#"
            UPDATE consignments SET
                to_branch_id      = COALESCE($2, to_branch_id),
                consignee_name    = COALESCE($3, consignee_name),
                consignee_phone   = COALESCE($4, consignee_phone),
                consignee_address = COALESCE($5, consignee_address),
                description       = COALESCE($6, description),
                packages          = COALESCE($7, packages),
                weight_kg         = COALESCE($8, weight_kg),
                freight_amount    = COALESCE($9, freight_amount),
                payment_mode      = COALESCE($10, payment_mode),
                updated_at        = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.to_branch_id)
        .bind(payload.consignee_name.as_deref())
        .bind(payload.consignee_phone.as_deref())
        .bind(payload.consignee_address.as_deref())
        .bind(payload.description.as_deref())
        .bind(payload.packages)
        .bind(payload.weight_kg)
        .bind(payload.freight_amount)
        .bind(payload.payment_mode)
        .fetch_one(executor)
        .await?;
        Ok(consignment)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ConsignmentStatus,
        current_branch_id: Option<Uuid>,
    ) -> Result<Consignment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let consignment = sqlx::query_as::<_, Consignment>(
            r#"
            UPDATE consignments
            SET status = $2, current_branch_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(current_branch_id)
        .fetch_one(executor)
        .await?;
        Ok(consignment)
    }

    /// Moves the listed consignments that are still in one of `from` to
    /// `status`. Returns the ids actually updated.
    pub async fn set_status_many<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ids: &[Uuid],
        from: &[ConsignmentStatus],
        status: ConsignmentStatus,
        current_branch_id: Option<Uuid>,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let from: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE consignments
            SET status = $4, current_branch_id = $5, updated_at = NOW()
            WHERE tenant_id = $1 AND id = ANY($2) AND status::text = ANY($3)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(ids)
        .bind(&from)
        .bind(status)
        .bind(current_branch_id)
        .fetch_all(executor)
        .await?;
        Ok(updated)
    }

    pub async fn append_tracking<'e, E>(
        &self,
        executor: E,
        consignment_id: Uuid,
        event: &NewTrackingEvent<'_>,
    ) -> Result<TrackingEvent, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let event = sqlx::query_as::<_, TrackingEvent>(
            r#"
            INSERT INTO tracking_events (tenant_id, consignment_id, status, branch_id, remarks, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, consignment_id, status, branch_id, remarks, created_by, created_at
            "#,
        )
        .bind(event.tenant_id)
        .bind(consignment_id)
        .bind(event.status)
        .bind(event.branch_id)
        .bind(event.remarks)
        .bind(event.created_by)
        .fetch_one(executor)
        .await?;
        Ok(event)
    }

    /// One identical event per consignment.
    pub async fn append_tracking_many<'e, E>(
        &self,
        executor: E,
        consignment_ids: &[Uuid],
        event: &NewTrackingEvent<'_>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO tracking_events (tenant_id, consignment_id, status, branch_id, remarks, created_by)
            SELECT $1, id, $3, $4, $5, $6 FROM UNNEST($2::uuid[]) AS t(id)
            "#,
        )
        .bind(event.tenant_id)
        .bind(consignment_ids)
        .bind(event.status)
        .bind(event.branch_id)
        .bind(event.remarks)
        .bind(event.created_by)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Chronological history; `id` breaks ties between events in the same instant.
    pub async fn tracking_for<'e, E>(
        &self,
        executor: E,
        consignment_id: Uuid,
    ) -> Result<Vec<TrackingEvent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let events = sqlx::query_as::<_, TrackingEvent>(
            r#"
            SELECT id, consignment_id, status, branch_id, remarks, created_by, created_at
            FROM tracking_events
            WHERE consignment_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(consignment_id)
        .fetch_all(executor)
        .await?;
        Ok(events)
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        filters: ConsignmentFilters,
        page: PageRequest,
    ) -> Result<Page<Consignment>, AppError> {
        ScopedQuery::new("consignments", ctx, RecordKind::Consignment)
            .date_range("booking_date", filters.booked)
            .filter_opt(
                filters
                    .search
                    .as_deref()
                    .and_then(|term| Filter::search(SEARCH_COLUMNS, term)),
            )
            .filter_opt(filters.status.map(|s| Filter::eq("status", s.as_str())))
            .filter_opt(filters.from_branch_id.map(|id| Filter::eq("from_branch_id", id)))
            .filter_opt(filters.to_branch_id.map(|id| Filter::eq("to_branch_id", id)))
            .filter_opt(filters.customer_id.map(|id| Filter::eq("customer_id", id)))
            .fetch_page(&self.pool, "*", SortOrder::desc("created_at"), page)
            .await
    }
}
