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
    models::customer::{CreateCustomerPayload, Customer, CustomerListQuery, UpdateCustomerPayload},
};

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CreateCustomerPayload,
    responses(
        (status = 201, description = "Customer created", body = Customer),
        (status = 400, description = "Invalid payload or phone already registered")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    payload: Result<Json<CreateCustomerPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let customer = app_state.customer_service.create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(customer))))
}

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(CustomerListQuery),
    responses(
        (status = 200, description = "Paginated customers", body = Vec<Customer>),
        (status = 400, description = "Invalid paging or date range")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    query: Result<Query<CustomerListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let customers = app_state.customer_service.list(&ctx, query).await?;
    Ok(Json(ApiResponse::paginated(customers)))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = Customer),
        (status = 404, description = "Customer not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let customer = app_state.customer_service.get(&ctx, id).await?;
    Ok(Json(ApiResponse::ok(customer)))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = UpdateCustomerPayload,
    responses(
        (status = 200, description = "Customer updated", body = Customer),
        (status = 404, description = "Customer not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateCustomerPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    payload.validate()?;

    let customer = app_state.customer_service.update(&ctx, id, payload).await?;
    Ok(Json(ApiResponse::ok(customer)))
}
