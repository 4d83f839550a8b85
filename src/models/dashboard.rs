use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::consignment::ConsignmentStatus;

/// Top-of-page cards.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_consignments: i64,
    pub total_freight: Decimal,
    pub total_weight_kg: Decimal,
    pub booked_today: i64,
    pub by_status: Vec<StatusCount>,
}

#[derive(Debug, FromRow)]
pub struct WindowTotals {
    pub total_consignments: i64,
    pub total_freight: Decimal,
    pub total_weight_kg: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: ConsignmentStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingChartEntry {
    pub date: NaiveDate,
    pub count: i64,
    pub freight: Decimal,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BranchActivity {
    pub branch_id: Uuid,
    pub branch_name: String,
    pub outgoing: i64,
    pub incoming: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChartQuery {
    /// Trailing window in days, 1 to 90 (default 30).
    pub days: Option<u32>,
}
