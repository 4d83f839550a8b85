use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    access::page::PageRequest,
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::{rbac::AdminOnly, tenancy::TenantContext},
    models::company::{Branch, BranchDraft, BranchListQuery, UpdateBranchPayload},
};

// GET /api/branches
#[utoipa::path(
    get,
    path = "/api/branches",
    tag = "Branches",
    params(BranchListQuery),
    responses((status = 200, description = "Paginated branch directory", body = Vec<Branch>)),
    security(("api_jwt" = []))
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    query: Result<Query<BranchListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let page = PageRequest::new(query.page, query.limit)?;

    let branches = app_state
        .company_service
        .list_branches(&ctx, query.search.as_deref(), page)
        .await?;
    Ok(Json(ApiResponse::paginated(branches)))
}

// GET /api/branches/{id}
#[utoipa::path(
    get,
    path = "/api/branches/{id}",
    tag = "Branches",
    params(("id" = Uuid, Path, description = "Branch id")),
    responses(
        (status = 200, description = "Branch", body = Branch),
        (status = 404, description = "Branch not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_branch(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let branch = app_state.company_service.get_branch(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(branch)))
}

// POST /api/branches
#[utoipa::path(
    post,
    path = "/api/branches",
    tag = "Branches",
    request_body = BranchDraft,
    responses(
        (status = 201, description = "Branch created", body = Branch),
        (status = 400, description = "Invalid payload or duplicate code"),
        (status = 403, description = "Administrators only")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_branch(
    State(app_state): State<AppState>,
    AdminOnly(ctx): AdminOnly,
    payload: Result<Json<BranchDraft>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let branch = app_state.company_service.create_branch(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(branch))))
}

// PUT /api/branches/{id}
#[utoipa::path(
    put,
    path = "/api/branches/{id}",
    tag = "Branches",
    params(("id" = Uuid, Path, description = "Branch id")),
    request_body = UpdateBranchPayload,
    responses(
        (status = 200, description = "Branch updated", body = Branch),
        (status = 403, description = "Administrators only"),
        (status = 404, description = "Branch not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_branch(
    State(app_state): State<AppState>,
    AdminOnly(ctx): AdminOnly,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateBranchPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    payload.validate()?;

    let branch = app_state.company_service.update_branch(&ctx, id, payload).await?;
    Ok(Json(ApiResponse::ok(branch)))
}
