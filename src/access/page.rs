use chrono::NaiveDate;

use crate::common::{error::AppError, response::Pagination};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// Validated page/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, AppError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        if page == 0 {
            return Err(AppError::BadRequest("page must be at least 1.".to_string()));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {MAX_LIMIT}."
            )));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// Inclusive calendar-date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, AppError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::BadRequest(
                    "fromDate must not be after toDate.".to_string(),
                ));
            }
        }
        Ok(Self { from, to })
    }
}

/// Primary sort column. `id` is always appended as a tie-breaker so pages do
/// not overlap when the primary key of the sort has duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: &'static str,
    pub descending: bool,
}

impl SortOrder {
    pub const fn desc(column: &'static str) -> Self {
        Self { column, descending: true }
    }

    pub const fn asc(column: &'static str) -> Self {
        Self { column, descending: false }
    }

    pub(crate) fn direction(&self) -> &'static str {
        if self.descending { "DESC" } else { "ASC" }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self { items, total, request }
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.request.page,
            limit: self.request.limit,
            total: self.total,
            total_pages: total_pages(self.total, self.request.limit),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

pub fn total_pages(total: i64, limit: u32) -> i64 {
    let limit = i64::from(limit.max(1));
    (total.max(0) + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let req = PageRequest::new(None, None).unwrap();
        assert_eq!(req, PageRequest { page: 1, limit: 20 });
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(101)).is_err());
        assert!(PageRequest::new(Some(3), Some(100)).is_ok());
    }

    #[test]
    fn offset_follows_page() {
        let req = PageRequest::new(Some(3), Some(25)).unwrap();
        assert_eq!(req.offset(), 50);
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(95, 10), 10);
    }

    #[test]
    fn pagination_block_reflects_request() {
        let page = Page::new(vec![1, 2, 3], 43, PageRequest::new(Some(2), Some(3)).unwrap());
        let meta = page.pagination();
        assert_eq!(meta.page, 2);
        assert_eq!(meta.limit, 3);
        assert_eq!(meta.total, 43);
        assert_eq!(meta.total_pages, 15);
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        assert!(DateRange::new(d("2025-02-01"), d("2025-01-01")).is_err());
        assert!(DateRange::new(d("2025-01-01"), d("2025-01-01")).is_ok());
        assert!(DateRange::new(None, d("2025-01-01")).is_ok());
    }
}
