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
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::tenancy::TenantContext,
    models::manifest::{CreateManifestPayload, Manifest, ManifestDetail, ManifestListQuery},
};

// POST /api/manifests
#[utoipa::path(
    post,
    path = "/api/manifests",
    tag = "Manifests",
    request_body = CreateManifestPayload,
    responses(
        (status = 201, description = "OGPL dispatched", body = Manifest),
        (status = 400, description = "Invalid payload or consignment not ready for loading"),
        (status = 404, description = "A listed consignment was not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_manifest(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    payload: Result<Json<CreateManifestPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let manifest = app_state.manifest_service.create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(manifest))))
}

// GET /api/manifests
#[utoipa::path(
    get,
    path = "/api/manifests",
    tag = "Manifests",
    params(ManifestListQuery),
    responses((status = 200, description = "Paginated manifests visible to the caller", body = Vec<Manifest>)),
    security(("api_jwt" = []))
)]
pub async fn list_manifests(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    query: Result<Query<ManifestListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let manifests = app_state.manifest_service.list(&ctx, query).await?;
    Ok(Json(ApiResponse::paginated(manifests)))
}

// GET /api/manifests/{id}
#[utoipa::path(
    get,
    path = "/api/manifests/{id}",
    tag = "Manifests",
    params(("id" = Uuid, Path, description = "Manifest id")),
    responses(
        (status = 200, description = "Manifest with its consignments", body = ManifestDetail),
        (status = 404, description = "Manifest not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_manifest(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let detail = app_state.manifest_service.get(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(detail)))
}

// POST /api/manifests/{id}/arrive
#[utoipa::path(
    post,
    path = "/api/manifests/{id}/arrive",
    tag = "Manifests",
    params(("id" = Uuid, Path, description = "Manifest id")),
    responses(
        (status = 200, description = "Manifest received at destination", body = Manifest),
        (status = 400, description = "Already arrived"),
        (status = 403, description = "Caller is not at the destination branch"),
        (status = 404, description = "Manifest not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn arrive_manifest(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let manifest = app_state.manifest_service.arrive(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(manifest)))
}
