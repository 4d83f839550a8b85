use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    access::{guard::Scoped, visibility::RecordKind},
    common::error::AppError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "consignment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConsignmentStatus {
    Booked,
    Picked,
    InTransit,
    Reached,
    OutForDelivery,
    Delivered,
    Undelivered,
    Cancelled,
}

impl ConsignmentStatus {
    pub const ALL: [ConsignmentStatus; 8] = [
        ConsignmentStatus::Booked,
        ConsignmentStatus::Picked,
        ConsignmentStatus::InTransit,
        ConsignmentStatus::Reached,
        ConsignmentStatus::OutForDelivery,
        ConsignmentStatus::Delivered,
        ConsignmentStatus::Undelivered,
        ConsignmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConsignmentStatus::Booked => "booked",
            ConsignmentStatus::Picked => "picked",
            ConsignmentStatus::InTransit => "in_transit",
            ConsignmentStatus::Reached => "reached",
            ConsignmentStatus::OutForDelivery => "out_for_delivery",
            ConsignmentStatus::Delivered => "delivered",
            ConsignmentStatus::Undelivered => "undelivered",
            ConsignmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConsignmentStatus::Delivered | ConsignmentStatus::Cancelled)
    }

    /// Any non-terminal status may move to any other status. Terminal
    /// statuses are frozen and a move to the current status is rejected.
    pub fn check_transition(self, next: ConsignmentStatus) -> Result<(), AppError> {
        if self.is_terminal() {
            return Err(AppError::BadRequest(format!(
                "Consignment is already {} and can no longer change status.",
                self
            )));
        }
        if self == next {
            return Err(AppError::BadRequest(format!("Consignment is already {next}.")));
        }
        Ok(())
    }

    /// Manifests only pick up consignments waiting at a branch.
    pub fn is_loadable(self) -> bool {
        matches!(self, ConsignmentStatus::Booked | ConsignmentStatus::Reached)
    }
}

impl fmt::Display for ConsignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsignmentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConsignmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                let allowed: Vec<&str> = ConsignmentStatus::ALL.iter().map(|s| s.as_str()).collect();
                AppError::BadRequest(format!(
                    "Invalid status '{}'. Allowed values: {}.",
                    s.trim(),
                    allowed.join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Paid,
    ToPay,
    ToBeBilled,
}

impl PaymentMode {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMode::Paid => "Paid",
            PaymentMode::ToPay => "To Pay",
            PaymentMode::ToBeBilled => "To Be Billed",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Consignment {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = 1024)]
    pub cn_number: i64,
    pub booking_date: NaiveDate,
    pub from_branch_id: Uuid,
    pub to_branch_id: Option<Uuid>,
    pub current_branch_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[schema(example = "Ramesh Traders")]
    pub consignor_name: String,
    pub consignor_phone: String,
    #[schema(example = "Kiran Stores")]
    pub consignee_name: String,
    pub consignee_phone: String,
    pub consignee_address: Option<String>,
    pub description: Option<String>,
    #[schema(example = 4)]
    pub packages: i32,
    #[schema(example = "120.500")]
    pub weight_kg: Decimal,
    #[schema(example = "1850.00")]
    pub freight_amount: Decimal,
    pub payment_mode: PaymentMode,
    pub status: ConsignmentStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scoped for Consignment {
    const KIND: RecordKind = RecordKind::Consignment;

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    fn branch_refs(&self) -> Vec<Option<Uuid>> {
        vec![Some(self.from_branch_id), self.to_branch_id, self.current_branch_id]
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub id: Uuid,
    pub consignment_id: Uuid,
    pub status: ConsignmentStatus,
    pub branch_id: Option<Uuid>,
    pub remarks: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookConsignmentPayload {
    /// Required for admins; branch staff always book from their own branch.
    pub from_branch_id: Option<Uuid>,
    pub to_branch_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub booking_date: Option<NaiveDate>,
    #[validate(length(min = 2, max = 120, message = "Consignor name must be 2 to 120 characters."))]
    pub consignor_name: String,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub consignor_phone: String,
    #[validate(length(min = 2, max = 120, message = "Consignee name must be 2 to 120 characters."))]
    pub consignee_name: String,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub consignee_phone: String,
    pub consignee_address: Option<String>,
    #[validate(length(max = 500, message = "Description is too long."))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10000, message = "Packages must be between 1 and 10000."))]
    pub packages: i32,
    #[validate(custom(function = "crate::models::validate_non_negative"))]
    pub weight_kg: Decimal,
    #[validate(custom(function = "crate::models::validate_non_negative"))]
    pub freight_amount: Decimal,
    pub payment_mode: PaymentMode,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConsignmentPayload {
    pub to_branch_id: Option<Uuid>,
    #[validate(length(min = 2, max = 120, message = "Consignee name must be 2 to 120 characters."))]
    pub consignee_name: Option<String>,
    #[validate(custom(function = "crate::models::validate_phone"))]
    pub consignee_phone: Option<String>,
    pub consignee_address: Option<String>,
    #[validate(length(max = 500, message = "Description is too long."))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10000, message = "Packages must be between 1 and 10000."))]
    pub packages: Option<i32>,
    #[validate(custom(function = "crate::models::validate_non_negative"))]
    pub weight_kg: Option<Decimal>,
    #[validate(custom(function = "crate::models::validate_non_negative"))]
    pub freight_amount: Option<Decimal>,
    pub payment_mode: Option<PaymentMode>,
}

/// `status` stays a string so an unknown value is reported by the status
/// parser rather than as a JSON shape error.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    #[schema(example = "in_transit")]
    pub status: String,
    #[validate(length(max = 500, message = "Remarks are too long."))]
    pub remarks: Option<String>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConsignmentListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Booking date, inclusive.
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    /// Matches CN number, consignor/consignee name or phone.
    pub search: Option<String>,
    pub status: Option<String>,
    pub from_branch_id: Option<Uuid>,
    pub to_branch_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_status() {
        for status in ConsignmentStatus::ALL {
            assert_eq!(status.as_str().parse::<ConsignmentStatus>().unwrap(), status);
        }
        assert_eq!(
            " IN_TRANSIT ".parse::<ConsignmentStatus>().unwrap(),
            ConsignmentStatus::InTransit
        );
    }

    #[test]
    fn unknown_status_is_bad_request() {
        let err = "teleported".parse::<ConsignmentStatus>().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(err.to_string().contains("out_for_delivery"));
    }

    #[test]
    fn any_status_is_reachable_from_booked() {
        for next in ConsignmentStatus::ALL {
            if next != ConsignmentStatus::Booked {
                assert!(ConsignmentStatus::Booked.check_transition(next).is_ok());
            }
        }
    }

    #[test]
    fn terminal_statuses_are_frozen() {
        assert!(ConsignmentStatus::Delivered
            .check_transition(ConsignmentStatus::Undelivered)
            .is_err());
        assert!(ConsignmentStatus::Cancelled
            .check_transition(ConsignmentStatus::Booked)
            .is_err());
        assert!(ConsignmentStatus::Undelivered
            .check_transition(ConsignmentStatus::OutForDelivery)
            .is_ok());
    }

    #[test]
    fn same_status_is_rejected() {
        assert!(ConsignmentStatus::Picked
            .check_transition(ConsignmentStatus::Picked)
            .is_err());
    }
}
