use std::collections::HashMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::common::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("One or more fields are invalid.")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    // Duplicate registrations and unique-key clashes. Reported as 400.
    #[error("{0}")]
    Conflict(String),

    #[error("Authentication token is missing.")]
    MissingToken,

    #[error("Authentication token is invalid or expired.")]
    InvalidToken,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Invalid or expired verification code.")]
    InvalidOtp,

    /// Authorization failures that are not about a single record's visibility.
    #[error("{0}")]
    Forbidden(String),

    /// Also used for records hidden by tenant or branch scope.
    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Document rendering error: {0}")]
    DocumentError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) | AppError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::MissingToken
            | AppError::InvalidToken
            | AppError::InvalidCredentials
            | AppError::InvalidOtp => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_)
            | AppError::DocumentError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a unique violation to `Conflict`, using the message registered for
    /// the violated constraint. Anything else stays a `DatabaseError`.
    pub fn from_unique_violation(err: sqlx::Error, constraints: &[(&str, &str)]) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let message = db_err
                    .constraint()
                    .and_then(|name| constraints.iter().find(|(c, _)| *c == name))
                    .map(|(_, message)| message.to_string())
                    .unwrap_or_else(|| "A record with these details already exists.".to_string());
                return AppError::Conflict(message);
            }
        }
        AppError::DatabaseError(err)
    }
}

// Extractor rejections become 400s inside the envelope instead of axum's
// plain-text bodies.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let AppError::ValidationError(errors) = &self {
            let mut details: HashMap<String, Vec<String>> = HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = ApiResponse::<()>::failure(self.to_string()).with_details(details);
            return (status, Json(body)).into_response();
        }

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Full detail goes to the log only.
            tracing::error!(error = ?self, "unexpected failure");
            "An unexpected error occurred.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("dup".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidOtp.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("no".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Consignment").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::DocumentError("font".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_errors_are_sanitized() {
        let response =
            AppError::InternalServerError(anyhow::anyhow!("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("hunter2"));
        assert!(body.contains("\"success\":false"));
    }
}
