pub mod access;
pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    middleware::{auth::auth_guard, tenancy::tenant_guard},
};

/// Builds the full HTTP surface. Everything except sign-in and onboarding
/// runs behind `auth_guard` then `tenant_guard`.
pub fn create_router(app_state: AppState) -> Router {
    let public_auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/otp/request", post(handlers::auth::request_otp))
        .route("/otp/verify", post(handlers::auth::verify_otp));

    let company_signup_routes =
        Router::new().route("/register", post(handlers::companies::register));

    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/company",
            get(handlers::companies::get_profile).put(handlers::companies::update_profile),
        )
        .route(
            "/branches",
            get(handlers::branches::list_branches).post(handlers::branches::create_branch),
        )
        .route(
            "/branches/{id}",
            get(handlers::branches::get_branch).put(handlers::branches::update_branch),
        )
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user).patch(handlers::users::update_user),
        )
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/{id}",
            get(handlers::customers::get_customer).put(handlers::customers::update_customer),
        )
        .route(
            "/consignments",
            get(handlers::consignments::list_consignments)
                .post(handlers::consignments::book_consignment),
        )
        .route(
            "/consignments/{id}",
            get(handlers::consignments::get_consignment)
                .put(handlers::consignments::update_consignment),
        )
        .route(
            "/consignments/{id}/status",
            patch(handlers::consignments::update_status),
        )
        .route(
            "/consignments/{id}/tracking",
            get(handlers::consignments::get_tracking),
        )
        .route(
            "/consignments/{id}/note.pdf",
            get(handlers::consignments::download_note),
        )
        .route(
            "/manifests",
            get(handlers::manifests::list_manifests).post(handlers::manifests::create_manifest),
        )
        .route("/manifests/{id}", get(handlers::manifests::get_manifest))
        .route(
            "/manifests/{id}/arrive",
            post(handlers::manifests::arrive_manifest),
        )
        .route("/dashboard/summary", get(handlers::dashboard::get_summary))
        .route(
            "/dashboard/bookings-chart",
            get(handlers::dashboard::get_bookings_chart),
        )
        .route(
            "/dashboard/branches",
            get(handlers::dashboard::get_branch_activity),
        )
        // Layers run bottom-up: the token is verified before the tenant is resolved.
        .layer(axum_middleware::from_fn(tenant_guard))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let timeout = Duration::from_secs(app_state.config.request_timeout_secs);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", public_auth_routes)
        .nest("/api/companies", company_signup_routes)
        .nest("/api", protected_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
