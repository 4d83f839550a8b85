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
    middleware::rbac::AdminOnly,
    models::{
        auth::User,
        user::{CreateUserPayload, UpdateUserPayload, UserListQuery},
    },
};

// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid payload, unknown branch or duplicate email/phone"),
        (status = 403, description = "Administrators only")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    AdminOnly(ctx): AdminOnly,
    payload: Result<Json<CreateUserPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let user = app_state.user_service.create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user))))
}

// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(UserListQuery),
    responses((status = 200, description = "Paginated users", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    AdminOnly(ctx): AdminOnly,
    query: Result<Query<UserListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let users = app_state.user_service.list(&ctx, query).await?;
    Ok(Json(ApiResponse::paginated(users)))
}

// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    AdminOnly(ctx): AdminOnly,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let user = app_state.user_service.get(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

// PATCH /api/users/{id}
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    AdminOnly(ctx): AdminOnly,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    payload.validate()?;

    let user = app_state.user_service.update(&ctx, id, payload).await?;
    Ok(Json(ApiResponse::ok(user)))
}
