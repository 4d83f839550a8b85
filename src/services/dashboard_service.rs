use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    access::{context::AccessContext, page::DateRange},
    common::error::AppError,
    db::DashboardRepository,
    models::dashboard::{
        BookingChartEntry, BranchActivity, ChartQuery, DashboardSummary, SummaryQuery,
    },
};

pub const DEFAULT_CHART_DAYS: u32 = 30;
pub const MAX_CHART_DAYS: u32 = 90;

fn chart_days(requested: Option<u32>) -> Result<u32, AppError> {
    match requested.unwrap_or(DEFAULT_CHART_DAYS) {
        days @ 1..=MAX_CHART_DAYS => Ok(days),
        _ => Err(AppError::BadRequest(format!(
            "days must be between 1 and {MAX_CHART_DAYS}."
        ))),
    }
}

/// One entry per day from `since` through `today`, zero where nothing was booked.
fn fill_days(
    since: NaiveDate,
    today: NaiveDate,
    rows: Vec<BookingChartEntry>,
) -> Vec<BookingChartEntry> {
    let mut rows = rows.into_iter().peekable();
    since
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|date| match rows.next_if(|r| r.date == date) {
            Some(row) => row,
            None => BookingChartEntry {
                date,
                count: 0,
                freight: Decimal::ZERO,
            },
        })
        .collect()
}

#[derive(Clone)]
pub struct DashboardService {
    repo: DashboardRepository,
}

impl DashboardService {
    pub fn new(repo: DashboardRepository) -> Self {
        Self { repo }
    }

    pub async fn summary(
        &self,
        ctx: &AccessContext,
        query: SummaryQuery,
    ) -> Result<DashboardSummary, AppError> {
        let booked = DateRange::new(query.from_date, query.to_date)?;
        self.repo
            .summary(ctx, booked, Utc::now().date_naive())
            .await
    }

    pub async fn bookings_chart(
        &self,
        ctx: &AccessContext,
        query: ChartQuery,
    ) -> Result<Vec<BookingChartEntry>, AppError> {
        let days = chart_days(query.days)?;
        let today = Utc::now().date_naive();
        let since = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .unwrap_or(today);

        let rows = self.repo.bookings_since(ctx, since).await?;
        Ok(fill_days(since, today, rows))
    }

    pub async fn branch_activity(&self, ctx: &AccessContext) -> Result<Vec<BranchActivity>, AppError> {
        self.repo.branch_activity(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn chart_window_bounds() {
        assert_eq!(chart_days(None).unwrap(), 30);
        assert_eq!(chart_days(Some(1)).unwrap(), 1);
        assert_eq!(chart_days(Some(90)).unwrap(), 90);
        assert!(chart_days(Some(0)).is_err());
        assert!(chart_days(Some(91)).is_err());
    }

    #[test]
    fn gaps_are_zero_filled() {
        let rows = vec![
            BookingChartEntry { date: day(2), count: 3, freight: Decimal::new(4500, 2) },
            BookingChartEntry { date: day(4), count: 1, freight: Decimal::new(900, 2) },
        ];
        let filled = fill_days(day(1), day(5), rows);

        let counts: Vec<i64> = filled.iter().map(|e| e.count).collect();
        assert_eq!(counts, vec![0, 3, 0, 1, 0]);
        assert_eq!(filled[0].date, day(1));
        assert_eq!(filled[4].date, day(5));
        assert_eq!(filled[1].freight, Decimal::new(4500, 2));
    }
}
