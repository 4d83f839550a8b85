use chrono::NaiveDate;
use sqlx::{postgres::PgRow, Acquire, FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    access::{
        context::AccessContext,
        page::{DateRange, Page, PageRequest, SortOrder},
        visibility::RecordKind,
    },
    common::error::AppError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Uuid(Uuid),
    /// Compared against the column's text form, so it also matches enum columns.
    Text(String),
    Bool(bool),
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Uuid(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// A single predicate. Column names are always compile-time constants; every
/// user-supplied value goes through a bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq {
        column: &'static str,
        value: FilterValue,
    },
    DateFrom {
        column: &'static str,
        date: NaiveDate,
    },
    DateTo {
        column: &'static str,
        date: NaiveDate,
    },
    /// Case-insensitive substring match over any of the columns.
    Search {
        columns: &'static [&'static str],
        term: String,
    },
    AnyOf(Vec<Filter>),
    Never,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Filter::Eq {
            column,
            value: value.into(),
        }
    }

    /// `None` for a blank term, so callers can pass the raw query parameter.
    pub fn search(columns: &'static [&'static str], term: &str) -> Option<Self> {
        let term = term.trim();
        if term.is_empty() || columns.is_empty() {
            return None;
        }
        Some(Filter::Search {
            columns,
            term: term.to_string(),
        })
    }

    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Filter::Eq { column, value } => match value {
                FilterValue::Uuid(v) => {
                    qb.push(*column).push(" = ").push_bind(*v);
                }
                FilterValue::Text(v) => {
                    qb.push("CAST(")
                        .push(*column)
                        .push(" AS TEXT) = ")
                        .push_bind(v.clone());
                }
                FilterValue::Bool(v) => {
                    qb.push(*column).push(" = ").push_bind(*v);
                }
            },
            Filter::DateFrom { column, date } => {
                qb.push("CAST(")
                    .push(*column)
                    .push(" AS DATE) >= ")
                    .push_bind(*date);
            }
            Filter::DateTo { column, date } => {
                qb.push("CAST(")
                    .push(*column)
                    .push(" AS DATE) <= ")
                    .push_bind(*date);
            }
            Filter::Search { columns, term } => {
                let pattern = format!("%{}%", escape_like(term));
                qb.push("(");
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push("CAST(")
                        .push(*column)
                        .push(" AS TEXT) ILIKE ")
                        .push_bind(pattern.clone());
                }
                qb.push(")");
            }
            Filter::AnyOf(terms) if terms.is_empty() => {
                qb.push("FALSE");
            }
            Filter::AnyOf(terms) => {
                qb.push("(");
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    term.push_sql(qb);
                }
                qb.push(")");
            }
            Filter::Never => {
                qb.push("FALSE");
            }
        }
    }
}

/// Escapes LIKE metacharacters so a search term only ever matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Tenant-scoped query over one table.
///
/// Construction requires an [`AccessContext`], so the tenant predicate and the
/// branch visibility predicate are always present. Additional filters can only
/// narrow the result.
#[derive(Debug, Clone)]
pub struct ScopedQuery {
    table: &'static str,
    tenant_id: Uuid,
    filters: Vec<Filter>,
}

impl ScopedQuery {
    pub fn new(table: &'static str, ctx: &AccessContext, kind: RecordKind) -> Self {
        let filters = ctx.visibility(kind).as_filter().into_iter().collect();
        Self {
            table,
            tenant_id: ctx.tenant_id,
            filters,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filter_opt(mut self, filter: Option<Filter>) -> Self {
        self.filters.extend(filter);
        self
    }

    pub fn date_range(mut self, column: &'static str, range: DateRange) -> Self {
        if let Some(date) = range.from {
            self.filters.push(Filter::DateFrom { column, date });
        }
        if let Some(date) = range.to {
            self.filters.push(Filter::DateTo { column, date });
        }
        self
    }

    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE tenant_id = ").push_bind(self.tenant_id);
        for filter in &self.filters {
            qb.push(" AND ");
            filter.push_sql(qb);
        }
    }

    /// `SELECT <projection> FROM <table> WHERE <scope>`; callers may append
    /// `GROUP BY` or `ORDER BY` clauses.
    pub fn select(&self, projection: &str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(projection).push(" FROM ").push(self.table);
        self.push_where(&mut qb);
        qb
    }

    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        self.select("COUNT(*)")
    }

    pub fn page_query(
        &self,
        columns: &str,
        order: SortOrder,
        page: PageRequest,
    ) -> QueryBuilder<'static, Postgres> {
        let dir = order.direction();
        let mut qb = self.select(columns);
        qb.push(" ORDER BY ")
            .push(order.column)
            .push(" ")
            .push(dir)
            .push(", id ")
            .push(dir)
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());
        qb
    }

    /// Runs count and page inside one read-only snapshot so `total` and
    /// `items` agree.
    pub async fn fetch_page<'a, T, A>(
        &self,
        conn: A,
        columns: &str,
        order: SortOrder,
        page: PageRequest,
    ) -> Result<Page<T>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut tx = conn.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut count = self.count_query();
        let total = count.build_query_scalar::<i64>().fetch_one(&mut *tx).await?;

        let mut select = self.page_query(columns, order, page);
        let items = select.build_query_as::<T>().fetch_all(&mut *tx).await?;

        tx.commit().await?;
        Ok(Page::new(items, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::role::Role;

    fn ctx(role: Role, branch_id: Option<Uuid>) -> AccessContext {
        AccessContext {
            tenant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            branch_id,
        }
    }

    #[test]
    fn admin_query_only_carries_tenant_predicate() {
        let q = ScopedQuery::new("consignments", &ctx(Role::Admin, None), RecordKind::Consignment);
        let qb = q.count_query();
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM consignments WHERE tenant_id = $1");
    }

    #[test]
    fn staff_query_ors_every_branch_column() {
        let q = ScopedQuery::new(
            "consignments",
            &ctx(Role::Staff, Some(Uuid::new_v4())),
            RecordKind::Consignment,
        );
        let qb = q.count_query();
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM consignments WHERE tenant_id = $1 AND \
             (from_branch_id = $2 OR to_branch_id = $3 OR current_branch_id = $4)"
        );
    }

    #[test]
    fn branchless_staff_query_matches_nothing() {
        let q = ScopedQuery::new("manifests", &ctx(Role::Staff, None), RecordKind::Manifest);
        let qb = q.count_query();
        assert!(qb.sql().ends_with("WHERE tenant_id = $1 AND FALSE"));
    }

    #[test]
    fn caller_filters_are_anded_after_scope() {
        let from = NaiveDate::from_ymd_opt(2025, 1, 1);
        let range = DateRange::new(from, None).unwrap();
        let q = ScopedQuery::new(
            "consignments",
            &ctx(Role::BranchManager, Some(Uuid::new_v4())),
            RecordKind::Consignment,
        )
        .filter(Filter::eq("status", "booked"))
        .filter_opt(Filter::search(&["consignor_name", "consignee_name"], "ram"))
        .date_range("booking_date", range);

        let qb = q.page_query("*", SortOrder::desc("created_at"), PageRequest::default());
        assert_eq!(
            qb.sql(),
            "SELECT * FROM consignments WHERE tenant_id = $1 AND \
             (from_branch_id = $2 OR to_branch_id = $3 OR current_branch_id = $4) AND \
             CAST(status AS TEXT) = $5 AND \
             (CAST(consignor_name AS TEXT) ILIKE $6 OR CAST(consignee_name AS TEXT) ILIKE $7) AND \
             CAST(booking_date AS DATE) >= $8 \
             ORDER BY created_at DESC, id DESC LIMIT $9 OFFSET $10"
        );
    }

    #[test]
    fn blank_search_is_dropped() {
        assert_eq!(Filter::search(&["name"], "   "), None);
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
