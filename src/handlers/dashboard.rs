use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::{error::AppError, response::ApiResponse},
    config::AppState,
    middleware::{rbac::AdminOnly, tenancy::TenantContext},
    models::dashboard::{
        BookingChartEntry, BranchActivity, ChartQuery, DashboardSummary, SummaryQuery,
    },
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Booking totals for the caller's scope", body = DashboardSummary),
        (status = 400, description = "Invalid date range")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let summary = app_state.dashboard_service.summary(&ctx, query).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

// GET /api/dashboard/bookings-chart
#[utoipa::path(
    get,
    path = "/api/dashboard/bookings-chart",
    tag = "Dashboard",
    params(ChartQuery),
    responses(
        (status = 200, description = "Bookings per day, one entry per day of the window", body = Vec<BookingChartEntry>),
        (status = 400, description = "days out of range")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_bookings_chart(
    State(app_state): State<AppState>,
    TenantContext(ctx): TenantContext,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let chart = app_state.dashboard_service.bookings_chart(&ctx, query).await?;
    Ok(Json(ApiResponse::ok(chart)))
}

// GET /api/dashboard/branches
#[utoipa::path(
    get,
    path = "/api/dashboard/branches",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Outgoing and incoming counts per branch", body = Vec<BranchActivity>),
        (status = 403, description = "Administrators only")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_branch_activity(
    State(app_state): State<AppState>,
    AdminOnly(ctx): AdminOnly,
) -> Result<impl IntoResponse, AppError> {
    let activity = app_state.dashboard_service.branch_activity(&ctx).await?;
    Ok(Json(ApiResponse::ok(activity)))
}
