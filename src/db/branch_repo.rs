use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    access::{
        context::AccessContext,
        filter::{Filter, ScopedQuery},
        page::{Page, PageRequest, SortOrder},
        visibility::RecordKind,
    },
    common::error::AppError,
    models::company::{Branch, BranchDraft, UpdateBranchPayload},
};

const UNIQUE_BRANCH_FIELDS: &[(&str, &str)] = &[
    ("branches_tenant_id_code_key", "A branch with this code already exists."),
    ("branches_one_head_office", "The company already has a head office."),
];

#[derive(Clone)]
pub struct BranchRepository {
    pool: PgPool,
}

impl BranchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        draft: &BranchDraft,
        is_head_office: bool,
    ) -> Result<Branch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (tenant_id, name, code, city, address, phone, is_head_office)
            VALUES ($1, $2, upper($3), $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(draft.name.trim())
        .bind(draft.code.trim())
        .bind(draft.city.trim())
        .bind(draft.address.as_deref())
        .bind(draft.phone.as_deref())
        .bind(is_head_office)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, UNIQUE_BRANCH_FIELDS))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let branch = sqlx::query_as::<_, Branch>("SELECT * FROM branches WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(branch)
    }

    /// Whether `id` names a branch of `tenant_id`. Used to validate
    /// client-supplied branch references.
    pub async fn belongs_to<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM branches WHERE tenant_id = $1 AND id = $2)",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn update(&self, id: Uuid, payload: &UpdateBranchPayload) -> Result<Branch, AppError> {
        sqlx::query_as::<_, Branch>(
            r#"
            UPDATE branches SET
                name       = COALESCE($2, name),
                code       = COALESCE(upper($3), code),
                city       = COALESCE($4, city),
                address    = COALESCE($5, address),
                phone      = COALESCE($6, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.name.as_deref())
        .bind(payload.code.as_deref())
        .bind(payload.city.as_deref())
        .bind(payload.address.as_deref())
        .bind(payload.phone.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, UNIQUE_BRANCH_FIELDS))
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Branch>, AppError> {
        ScopedQuery::new("branches", ctx, RecordKind::Branch)
            .filter_opt(search.and_then(|term| Filter::search(&["name", "code", "city"], term)))
            .fetch_page(&self.pool, "*", SortOrder::asc("name"), page)
            .await
    }
}
