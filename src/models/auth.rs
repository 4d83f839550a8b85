use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::access::{guard::Scoped, role::Role, visibility::RecordKind};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub branch_id: Option<Uuid>,
    #[schema(example = "Asha Verma")]
    pub full_name: String,
    #[schema(example = "asha@swiftcargo.in")]
    pub email: String,
    #[schema(example = "+919876543210")]
    pub phone: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scoped for User {
    const KIND: RecordKind = RecordKind::User;

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn branch_refs(&self) -> Vec<Option<Uuid>> {
        vec![self.branch_id]
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "Email address is invalid."))]
    #[schema(example = "asha@swiftcargo.in")]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OtpRequestPayload {
    #[validate(custom(function = "crate::models::validate_phone"))]
    #[schema(example = "+919876543210")]
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OtpVerifyPayload {
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: String,
    #[validate(length(equal = 6, message = "Code must be 6 digits."))]
    #[schema(example = "482913")]
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OtpRequested {
    pub sent: bool,
}

/// Pending one-time code for phone login.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
}

/// JWT payload. Tenant, role and branch are fixed at issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub branch_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}
