use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    access::{guard::Scoped, visibility::RecordKind},
    common::error::AppError,
    models::consignment::Consignment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "manifest_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Dispatched,
    Arrived,
}

impl ManifestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ManifestStatus::Dispatched => "dispatched",
            ManifestStatus::Arrived => "arrived",
        }
    }
}

impl FromStr for ManifestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dispatched" => Ok(ManifestStatus::Dispatched),
            "arrived" => Ok(ManifestStatus::Arrived),
            other => Err(AppError::BadRequest(format!(
                "Invalid manifest status '{other}'. Allowed values: dispatched, arrived."
            ))),
        }
    }
}

/// Outward goods-passing list (OGPL): one vehicle trip between two branches.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = 57)]
    pub manifest_number: i64,
    pub from_branch_id: Uuid,
    pub to_branch_id: Uuid,
    #[schema(example = "MH12AB1234")]
    pub vehicle_number: String,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub status: ManifestStatus,
    pub dispatched_at: DateTime<Utc>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Scoped for Manifest {
    const KIND: RecordKind = RecordKind::Manifest;

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn branch_refs(&self) -> Vec<Option<Uuid>> {
        vec![Some(self.from_branch_id), Some(self.to_branch_id)]
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDetail {
    #[serde(flatten)]
    pub manifest: Manifest,
    pub consignments: Vec<Consignment>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateManifestPayload {
    pub from_branch_id: Option<Uuid>,
    pub to_branch_id: Uuid,
    #[validate(length(min = 4, max = 20, message = "Vehicle number must be 4 to 20 characters."))]
    pub vehicle_number: String,
    #[validate(length(min = 2, max = 120, message = "Driver name must be 2 to 120 characters."))]
    pub driver_name: Option<String>,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub driver_phone: Option<String>,
    #[validate(length(min = 1, max = 500, message = "A manifest needs 1 to 500 consignments."))]
    pub consignment_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ManifestListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Dispatch date, inclusive.
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    /// Matches manifest number, vehicle number or driver name.
    pub search: Option<String>,
    /// `dispatched` or `arrived`.
    pub status: Option<String>,
}
