use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::access::role::Role;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 2, max = 120, message = "Full name must be 2 to 120 characters."))]
    pub full_name: String,
    #[validate(email(message = "Email address is invalid."))]
    pub email: String,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: String,
    pub role: Role,
    pub branch_id: Option<Uuid>,
}

/// `branchId: null` is not distinguishable from an absent field; use
/// `clearBranch` to unassign.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 2, max = 120, message = "Full name must be 2 to 120 characters."))]
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub branch_id: Option<Uuid>,
    #[serde(default)]
    pub clear_branch: bool,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Matches name, email or phone.
    pub search: Option<String>,
    /// One of `superadmin`, `admin`, `branch_manager`, `staff`.
    pub role: Option<String>,
    pub branch_id: Option<Uuid>,
}
