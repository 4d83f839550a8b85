use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    access::{
        context::AccessContext,
        filter::{Filter, ScopedQuery},
        page::DateRange,
        visibility::RecordKind,
    },
    common::error::AppError,
    models::dashboard::{
        BookingChartEntry, BranchActivity, DashboardSummary, StatusCount, WindowTotals,
    },
};

#[derive(Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn consignments(ctx: &AccessContext) -> ScopedQuery {
        ScopedQuery::new("consignments", ctx, RecordKind::Consignment)
    }

    /// Totals over the booking window plus today's bookings, read from one
    /// snapshot.
    pub async fn summary(
        &self,
        ctx: &AccessContext,
        booked: DateRange,
        today: NaiveDate,
    ) -> Result<DashboardSummary, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let windowed = Self::consignments(ctx).date_range("booking_date", booked);

        let mut totals_q = windowed.select(
            "COUNT(*) AS total_consignments, \
             COALESCE(SUM(freight_amount), 0) AS total_freight, \
             COALESCE(SUM(weight_kg), 0) AS total_weight_kg",
        );
        let totals = totals_q
            .build_query_as::<WindowTotals>()
            .fetch_one(&mut *tx)
            .await?;

        let mut today_q = Self::consignments(ctx)
            .date_range("booking_date", DateRange { from: Some(today), to: Some(today) })
            .count_query();
        let booked_today = today_q
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await?;

        let mut status_q = windowed.select("status, COUNT(*) AS count");
        status_q.push(" GROUP BY status ORDER BY status");
        let by_status = status_q
            .build_query_as::<StatusCount>()
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DashboardSummary {
            total_consignments: totals.total_consignments,
            total_freight: totals.total_freight,
            total_weight_kg: totals.total_weight_kg,
            booked_today,
            by_status,
        })
    }

    /// Per-day bookings from `since` on. Days without bookings are absent.
    pub async fn bookings_since(
        &self,
        ctx: &AccessContext,
        since: NaiveDate,
    ) -> Result<Vec<BookingChartEntry>, AppError> {
        let mut q = Self::consignments(ctx)
            .filter(Filter::DateFrom { column: "booking_date", date: since })
            .select(
                "booking_date AS date, COUNT(*) AS count, \
                 COALESCE(SUM(freight_amount), 0) AS freight",
            );
        q.push(" GROUP BY booking_date ORDER BY booking_date");

        let rows = q
            .build_query_as::<BookingChartEntry>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Outgoing and incoming consignment counts for every branch of the tenant.
    pub async fn branch_activity(
        &self,
        ctx: &AccessContext,
    ) -> Result<Vec<BranchActivity>, AppError> {
        let mut q = ScopedQuery::new("branches", ctx, RecordKind::Branch).select(
            "branches.id AS branch_id, branches.name AS branch_name, \
             (SELECT COUNT(*) FROM consignments c \
                WHERE c.tenant_id = branches.tenant_id AND c.from_branch_id = branches.id) AS outgoing, \
             (SELECT COUNT(*) FROM consignments c \
                WHERE c.tenant_id = branches.tenant_id AND c.to_branch_id = branches.id) AS incoming",
        );
        q.push(" ORDER BY branches.name, branches.id");

        let rows = q
            .build_query_as::<BranchActivity>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
