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
    models::{
        consignment::Consignment,
        manifest::{Manifest, ManifestStatus},
    },
};

#[derive(Debug, Default)]
pub struct ManifestFilters {
    pub dispatched: DateRange,
    pub search: Option<String>,
    pub status: Option<ManifestStatus>,
}

#[derive(Debug)]
pub struct NewManifest<'a> {
    pub tenant_id: Uuid,
    pub manifest_number: i64,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    pub vehicle_number: &'a str,
    pub driver_name: Option<&'a str>,
    pub driver_phone: Option<&'a str>,
    pub created_by: Uuid,
}

#[derive(Clone)]
pub struct ManifestRepository {
    pool: PgPool,
}

impl ManifestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, new: NewManifest<'_>) -> Result<Manifest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let manifest = sqlx::query_as::<_, Manifest>(
            r#"
            INSERT INTO manifests (
                tenant_id, manifest_number, from_branch_id, to_branch_id,
                vehicle_number, driver_name, driver_phone, created_by
            )
            VALUES ($1, $2, $3, $4, upper($5), $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.tenant_id)
        .bind(new.manifest_number)
        .bind(new.from_branch_id)
        .bind(new.to_branch_id)
        .bind(new.vehicle_number)
        .bind(new.driver_name)
        .bind(new.driver_phone)
        .bind(new.created_by)
        .fetch_one(executor)
        .await?;
        Ok(manifest)
    }

    pub async fn link_consignments<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        manifest_id: Uuid,
        consignment_ids: &[Uuid],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO manifest_consignments (tenant_id, manifest_id, consignment_id)
            SELECT $1, $2, id FROM UNNEST($3::uuid[]) AS t(id)
            "#,
        )
        .bind(tenant_id)
        .bind(manifest_id)
        .bind(consignment_ids)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Manifest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let manifest = sqlx::query_as::<_, Manifest>("SELECT * FROM manifests WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(manifest)
    }

    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Manifest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let manifest =
            sqlx::query_as::<_, Manifest>("SELECT * FROM manifests WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(manifest)
    }

    pub async fn consignments_of<'e, E>(
        &self,
        executor: E,
        manifest_id: Uuid,
    ) -> Result<Vec<Consignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Consignment>(
            r#"
            SELECT c.*
            FROM consignments c
            JOIN manifest_consignments mc
              ON mc.consignment_id = c.id AND mc.tenant_id = c.tenant_id
            WHERE mc.manifest_id = $1
            ORDER BY c.cn_number, c.id
            "#,
        )
        .bind(manifest_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// The manifest's consignments, row-locked until the surrounding
    /// transaction ends.
    pub async fn lock_load<'e, E>(
        &self,
        executor: E,
        manifest_id: Uuid,
    ) -> Result<Vec<Consignment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Consignment>(
            r#"
            SELECT c.*
            FROM consignments c
            JOIN manifest_consignments mc
              ON mc.consignment_id = c.id AND mc.tenant_id = c.tenant_id
            WHERE mc.manifest_id = $1
            ORDER BY c.id
            FOR UPDATE OF c
            "#,
        )
        .bind(manifest_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn mark_arrived<'e, E>(&self, executor: E, id: Uuid) -> Result<Manifest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let manifest = sqlx::query_as::<_, Manifest>(
            r#"
            UPDATE manifests SET status = 'arrived', arrived_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(manifest)
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        filters: ManifestFilters,
        page: PageRequest,
    ) -> Result<Page<Manifest>, AppError> {
        ScopedQuery::new("manifests", ctx, RecordKind::Manifest)
            .date_range("dispatched_at", filters.dispatched)
            .filter_opt(filters.search.as_deref().and_then(|term| {
                Filter::search(&["manifest_number", "vehicle_number", "driver_name"], term)
            }))
            .filter_opt(filters.status.map(|s| Filter::eq("status", s.as_str())))
            .fetch_page(&self.pool, "*", SortOrder::desc("dispatched_at"), page)
            .await
    }
}
