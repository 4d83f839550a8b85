use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::access::{guard::Scoped, visibility::RecordKind};

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Ramesh Traders")]
    pub name: String,
    #[schema(example = "+919812345678")]
    pub phone: String,
    pub email: Option<String>,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scoped for Customer {
    const KIND: RecordKind = RecordKind::Customer;

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[validate(length(min = 2, max = 120, message = "Name must be 2 to 120 characters."))]
    pub name: String,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: String,
    #[validate(email(message = "Email address is invalid."))]
    pub email: Option<String>,
    #[validate(length(min = 15, max = 15, message = "GST number must be 15 characters."))]
    pub gst_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerPayload {
    #[validate(length(min = 2, max = 120, message = "Name must be 2 to 120 characters."))]
    pub name: Option<String>,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub phone: Option<String>,
    #[validate(email(message = "Email address is invalid."))]
    pub email: Option<String>,
    #[validate(length(min = 15, max = 15, message = "GST number must be 15 characters."))]
    pub gst_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Matches name, phone, email or GST number.
    pub search: Option<String>,
    /// Creation date, inclusive.
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}
