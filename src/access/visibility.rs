use uuid::Uuid;

use crate::access::{
    filter::{Filter, FilterValue},
    role::Role,
};

/// Record types that go through the access core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Consignment,
    Manifest,
    User,
    Customer,
    Branch,
}

impl RecordKind {
    /// Columns relating a record to a branch. A branch-scoped user sees the
    /// record when any of them equals their branch.
    pub const fn branch_columns(self) -> &'static [&'static str] {
        match self {
            RecordKind::Consignment => &["from_branch_id", "to_branch_id", "current_branch_id"],
            RecordKind::Manifest => &["from_branch_id", "to_branch_id"],
            RecordKind::User => &["branch_id"],
            RecordKind::Customer | RecordKind::Branch => &[],
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RecordKind::Consignment => "Consignment",
            RecordKind::Manifest => "Manifest",
            RecordKind::User => "User",
            RecordKind::Customer => "Customer",
            RecordKind::Branch => "Branch",
        }
    }
}

/// Row-level visibility inside an already-fixed tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Whole tenant.
    Tenant,
    /// Rows where any of `columns` equals `branch_id`.
    Branch {
        branch_id: Uuid,
        columns: &'static [&'static str],
    },
    /// Fail closed.
    Nothing,
}

impl Visibility {
    pub fn compute(role: Role, assigned_branch: Option<Uuid>, kind: RecordKind) -> Self {
        let columns = kind.branch_columns();
        if role.is_privileged() || columns.is_empty() {
            return Visibility::Tenant;
        }
        match assigned_branch {
            Some(branch_id) => Visibility::Branch { branch_id, columns },
            None => Visibility::Nothing,
        }
    }

    /// In-memory twin of [`Visibility::as_filter`]. `branch_refs` lines up with
    /// the record kind's branch columns.
    pub fn permits(&self, branch_refs: &[Option<Uuid>]) -> bool {
        match self {
            Visibility::Tenant => true,
            Visibility::Branch { branch_id, .. } => branch_refs.contains(&Some(*branch_id)),
            Visibility::Nothing => false,
        }
    }

    pub fn as_filter(&self) -> Option<Filter> {
        match self {
            Visibility::Tenant => None,
            Visibility::Branch { branch_id, columns } => Some(Filter::AnyOf(
                columns
                    .iter()
                    .map(|&column| Filter::Eq {
                        column,
                        value: FilterValue::Uuid(*branch_id),
                    })
                    .collect(),
            )),
            Visibility::Nothing => Some(Filter::Never),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_roles_are_unrestricted() {
        for role in [Role::Admin, Role::Superadmin] {
            assert_eq!(
                Visibility::compute(role, None, RecordKind::Consignment),
                Visibility::Tenant
            );
            assert_eq!(
                Visibility::compute(role, Some(Uuid::new_v4()), RecordKind::Manifest),
                Visibility::Tenant
            );
        }
    }

    #[test]
    fn staff_are_restricted_to_their_branch_across_all_columns() {
        let branch = Uuid::new_v4();
        let v = Visibility::compute(Role::Staff, Some(branch), RecordKind::Consignment);
        assert_eq!(
            v,
            Visibility::Branch {
                branch_id: branch,
                columns: &["from_branch_id", "to_branch_id", "current_branch_id"],
            }
        );

        let Some(Filter::AnyOf(terms)) = v.as_filter() else {
            panic!("expected an OR group");
        };
        assert_eq!(terms.len(), 3);
    }

    #[test]
    fn staff_without_branch_match_nothing() {
        let v = Visibility::compute(Role::BranchManager, None, RecordKind::Consignment);
        assert_eq!(v, Visibility::Nothing);
        assert_eq!(v.as_filter(), Some(Filter::Never));
        assert!(!v.permits(&[None, None, None]));
    }

    #[test]
    fn kinds_without_branch_columns_are_tenant_wide() {
        assert_eq!(
            Visibility::compute(Role::Staff, None, RecordKind::Customer),
            Visibility::Tenant
        );
        assert_eq!(
            Visibility::compute(Role::Staff, Some(Uuid::new_v4()), RecordKind::Branch),
            Visibility::Tenant
        );
    }

    #[test]
    fn permits_matches_any_branch_relationship() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let v = Visibility::compute(Role::Staff, Some(a), RecordKind::Consignment);

        // origin A, destination C
        assert!(v.permits(&[Some(a), Some(c), None]));
        // origin B, destination C, currently at A
        assert!(v.permits(&[Some(b), Some(c), Some(a)]));
        // origin B, destination C, A uninvolved
        assert!(!v.permits(&[Some(b), Some(c), None]));
    }
}
