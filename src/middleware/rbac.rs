use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    access::context::AccessContext, common::error::AppError, middleware::tenancy::TenantContext,
};

/// Admits superadmins and admins only.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub AccessContext);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TenantContext(ctx) = TenantContext::from_request_parts(parts, state).await?;
        if !ctx.is_privileged() {
            tracing::debug!(user_id = %ctx.user_id, role = %ctx.role, "admin route refused");
            return Err(AppError::Forbidden(
                "This action requires an administrator.".to_string(),
            ));
        }
        Ok(AdminOnly(ctx))
    }
}
