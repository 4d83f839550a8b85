use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{common::error::AppError, config::AppState, models::auth::Claims};

/// Reads and verifies the bearer token. Validation uses the token alone;
/// nothing is looked up.
pub fn bearer_claims(state: &AppState, headers: &HeaderMap) -> Result<Claims, AppError> {
    if !headers.contains_key(AUTHORIZATION) {
        return Err(AppError::MissingToken);
    }
    let Authorization(bearer) = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)?;
    state.tokens.verify(bearer.token())
}

pub async fn auth_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = bearer_claims(&state, request.headers())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
