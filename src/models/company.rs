use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    access::{guard::Scoped, visibility::RecordKind},
    models::auth::User,
};

/// A tenant.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    #[schema(example = "Swift Cargo Movers")]
    pub name: String,
    pub email: String,
    pub phone: String,
    #[schema(example = "27AAPFU0939F1ZV")]
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Pune Hub")]
    pub name: String,
    #[schema(example = "PNQ")]
    pub code: String,
    #[schema(example = "Pune")]
    pub city: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_head_office: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scoped for Branch {
    const KIND: RecordKind = RecordKind::Branch;

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

// --- Onboarding ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCompanyPayload {
    #[validate(length(min = 2, max = 120, message = "Company name must be 2 to 120 characters."))]
    pub company_name: String,
    #[validate(email(message = "Company email is invalid."))]
    pub email: String,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: String,
    #[validate(length(min = 15, max = 15, message = "GST number must be 15 characters."))]
    pub gst_number: Option<String>,
    pub address: Option<String>,
    #[validate(nested)]
    pub head_office: BranchDraft,
    #[validate(nested)]
    pub admin: AdminDraft,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchDraft {
    #[validate(length(min = 2, max = 120, message = "Branch name must be 2 to 120 characters."))]
    pub name: String,
    #[validate(length(min = 2, max = 10, message = "Branch code must be 2 to 10 characters."))]
    pub code: String,
    #[validate(length(min = 2, message = "City is required."))]
    pub city: String,
    pub address: Option<String>,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminDraft {
    #[validate(length(min = 2, max = 120, message = "Full name must be 2 to 120 characters."))]
    pub full_name: String,
    #[validate(email(message = "Admin email is invalid."))]
    pub email: String,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRegistered {
    pub company: Company,
    pub head_office: Branch,
    pub admin: User,
    pub token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyPayload {
    #[validate(length(min = 2, max = 120, message = "Company name must be 2 to 120 characters."))]
    pub name: Option<String>,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 15, max = 15, message = "GST number must be 15 characters."))]
    pub gst_number: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 500, message = "Logo URL is too long."))]
    pub logo_url: Option<String>,
}

// --- Branch management ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBranchPayload {
    #[validate(length(min = 2, max = 120, message = "Branch name must be 2 to 120 characters."))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 10, message = "Branch code must be 2 to 10 characters."))]
    pub code: Option<String>,
    #[validate(length(min = 2, message = "City is required."))]
    pub city: Option<String>,
    pub address: Option<String>,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BranchListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Matches name, code or city.
    pub search: Option<String>,
}
