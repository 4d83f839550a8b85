use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::tenancy::TenantContext,
    models::consignment::{
        BookConsignmentPayload, Consignment, ConsignmentListQuery, TrackingEvent,
        UpdateConsignmentPayload, UpdateStatusPayload,
    },
};

// POST /api/consignments
#[utoipa::path(
    post,
    path = "/api/consignments",
    tag = "Consignments",
    request_body = BookConsignmentPayload,
    responses(
        (status = 201, description = "Consignment booked", body = Consignment),
        (status = 400, description = "Invalid payload, branch or customer"),
        (status = 403, description = "Booking outside your branch")
    ),
    security(("api_jwt" = []))
)]
pub async fn book_consignment(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    payload: Result<Json<BookConsignmentPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let consignment = app_state.consignment_service.book(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(consignment))))
}

// GET /api/consignments
#[utoipa::path(
    get,
    path = "/api/consignments",
    tag = "Consignments",
    params(ConsignmentListQuery),
    responses(
        (status = 200, description = "Paginated consignments visible to the caller", body = Vec<Consignment>),
        (status = 400, description = "Invalid paging, date range or status")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_consignments(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    query: Result<Query<ConsignmentListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let consignments = app_state.consignment_service.list(&ctx, query).await?;
    Ok(Json(ApiResponse::paginated(consignments)))
}

// GET /api/consignments/{id}
#[utoipa::path(
    get,
    path = "/api/consignments/{id}",
    tag = "Consignments",
    params(("id" = Uuid, Path, description = "Consignment id")),
    responses(
        (status = 200, description = "Consignment", body = Consignment),
        (status = 404, description = "Consignment not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_consignment(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let consignment = app_state.consignment_service.get(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(consignment)))
}

// PUT /api/consignments/{id}
#[utoipa::path(
    put,
    path = "/api/consignments/{id}",
    tag = "Consignments",
    params(("id" = Uuid, Path, description = "Consignment id")),
    request_body = UpdateConsignmentPayload,
    responses(
        (status = 200, description = "Consignment updated", body = Consignment),
        (status = 400, description = "Delivered or cancelled consignments are read-only"),
        (status = 404, description = "Consignment not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_consignment(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateConsignmentPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    payload.validate()?;

    let consignment = app_state.consignment_service.update(&ctx, id, payload).await?;
    Ok(Json(ApiResponse::ok(consignment)))
}

// PATCH /api/consignments/{id}/status
#[utoipa::path(
    patch,
    path = "/api/consignments/{id}/status",
    tag = "Consignments",
    params(("id" = Uuid, Path, description = "Consignment id")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status changed and tracking event recorded", body = Consignment),
        (status = 400, description = "Unknown status or disallowed transition"),
        (status = 404, description = "Consignment not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStatusPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    payload.validate()?;

    let consignment = app_state
        .consignment_service
        .update_status(&ctx, id, payload)
        .await?;
    Ok(Json(ApiResponse::ok(consignment)))
}

// GET /api/consignments/{id}/tracking
#[utoipa::path(
    get,
    path = "/api/consignments/{id}/tracking",
    tag = "Consignments",
    params(("id" = Uuid, Path, description = "Consignment id")),
    responses(
        (status = 200, description = "Tracking history, oldest first", body = Vec<TrackingEvent>),
        (status = 404, description = "Consignment not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_tracking(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let events = app_state.consignment_service.tracking(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(events)))
}

// GET /api/consignments/{id}/note.pdf
#[utoipa::path(
    get,
    path = "/api/consignments/{id}/note.pdf",
    tag = "Consignments",
    params(("id" = Uuid, Path, description = "Consignment id")),
    responses(
        (status = 200, description = "Printable consignment note (application/pdf)"),
        (status = 404, description = "Consignment not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn download_note(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let consignment = app_state.consignment_service.get(&ctx, id).await?;
    let filename = format!("attachment; filename=\"CN-{}.pdf\"", consignment.cn_number);

    let pdf = app_state
        .document_service
        .consignment_note(&ctx, consignment)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        pdf,
    ))
}
