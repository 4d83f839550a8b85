//! Tenant- and branch-scoped authorization applied to data queries.
//!
//! Every list query goes through [`filter::ScopedQuery`], which always carries
//! the tenant predicate and the caller's branch visibility. Single-record reads
//! and writes go through [`context::AccessContext::admit`], which hides records
//! outside the caller's scope behind the same `NotFound` as a missing row.

pub mod context;
pub mod filter;
pub mod guard;
pub mod page;
pub mod role;
pub mod visibility;

pub use context::{AccessContext, TENANT_HINT_HEADER};
pub use filter::{Filter, FilterValue, ScopedQuery};
pub use guard::Scoped;
pub use page::{DateRange, Page, PageRequest, SortOrder};
pub use role::Role;
pub use visibility::{RecordKind, Visibility};
