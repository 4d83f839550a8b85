use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::{rbac::AdminOnly, tenancy::TenantContext},
    models::company::{Company, CompanyRegistered, RegisterCompanyPayload, UpdateCompanyPayload},
};

// POST /api/companies/register
#[utoipa::path(
    post,
    path = "/api/companies/register",
    tag = "Company",
    request_body = RegisterCompanyPayload,
    responses(
        (status = 201, description = "Company, head office and admin created", body = CompanyRegistered),
        (status = 400, description = "Invalid payload or duplicate email/phone")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    payload: Result<Json<RegisterCompanyPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let registered = app_state.company_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(registered))))
}

// GET /api/company
#[utoipa::path(
    get,
    path = "/api/company",
    tag = "Company",
    responses((status = 200, description = "Current company profile", body = Company)),
    security(("api_jwt" = []))
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let company = app_state.company_service.profile(&ctx).await?;
    Ok(Json(ApiResponse::ok(company)))
}

// PUT /api/company
#[utoipa::path(
    put,
    path = "/api/company",
    tag = "Company",
    request_body = UpdateCompanyPayload,
    responses(
        (status = 200, description = "Profile updated", body = Company),
        (status = 403, description = "Administrators only")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    AdminOnly(ctx): AdminOnly,
    payload: Result<Json<UpdateCompanyPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let company = app_state.company_service.update_profile(&ctx, payload).await?;
    Ok(Json(ApiResponse::ok(company)))
}
