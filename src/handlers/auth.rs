use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::tenancy::TenantContext,
    models::auth::{
        AuthResponse, LoginPayload, OtpRequestPayload, OtpRequested, OtpVerifyPayload, User,
    },
};

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let session = app_state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(ApiResponse::ok(session)))
}

// POST /api/auth/otp/request
#[utoipa::path(
    post,
    path = "/api/auth/otp/request",
    tag = "Auth",
    request_body = OtpRequestPayload,
    responses(
        (status = 200, description = "Accepted. The same answer is given whether or not the phone is registered", body = OtpRequested),
        (status = 400, description = "Invalid phone number")
    )
)]
pub async fn request_otp(
    State(app_state): State<AppState>,
    payload: Result<Json<OtpRequestPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    app_state.auth_service.request_otp(&payload.phone).await?;
    Ok(Json(ApiResponse::ok(OtpRequested { sent: true })))
}

// POST /api/auth/otp/verify
#[utoipa::path(
    post,
    path = "/api/auth/otp/verify",
    tag = "Auth",
    request_body = OtpVerifyPayload,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid, expired or exhausted code")
    )
)]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    payload: Result<Json<OtpVerifyPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let session = app_state
        .auth_service
        .verify_otp(&payload.phone, &payload.code)
        .await?;
    Ok(Json(ApiResponse::ok(session)))
}

// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    ),
    security(("api_jwt" = []))
)]
pub async fn me(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let user = app_state.auth_service.me(&ctx).await?;
    Ok(Json(ApiResponse::ok(user)))
}
