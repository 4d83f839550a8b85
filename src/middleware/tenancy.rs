use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{
    access::context::{AccessContext, TENANT_HINT_HEADER},
    common::error::AppError,
    models::auth::Claims,
};

/// Resolves the caller's [`AccessContext`] before any handler runs. Must be
/// layered inside `auth_guard`.
pub async fn tenant_guard(mut request: Request, next: Next) -> Result<Response, AppError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or(AppError::MissingToken)?;

    let hint = match request.headers().get(TENANT_HINT_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| {
            AppError::BadRequest("X-Tenant-ID header contains invalid characters.".to_string())
        })?),
        None => None,
    };

    let ctx = AccessContext::resolve(claims, hint)?;
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// The resolved context, extracted in handlers.
#[derive(Debug, Clone)]
pub struct TenantContext(pub AccessContext);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessContext>()
            .cloned()
            .map(TenantContext)
            .ok_or_else(|| {
                AppError::InternalServerError(anyhow::anyhow!(
                    "access context missing; tenant_guard is not applied to this route"
                ))
            })
    }
}
