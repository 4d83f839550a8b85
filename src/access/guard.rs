use uuid::Uuid;

use crate::{
    access::{context::AccessContext, visibility::RecordKind},
    common::error::AppError,
};

/// A record owned by a tenant and optionally tied to branches.
pub trait Scoped {
    const KIND: RecordKind;

    fn tenant_id(&self) -> Uuid;

    /// Values of [`RecordKind::branch_columns`], in the same order.
    fn branch_refs(&self) -> Vec<Option<Uuid>> {
        Vec::new()
    }
}

impl AccessContext {
    pub fn can_see<T: Scoped>(&self, record: &T) -> bool {
        record.tenant_id() == self.tenant_id
            && self.visibility(T::KIND).permits(&record.branch_refs())
    }

    /// Gate for single-record reads and writes. Missing, foreign-tenant and
    /// out-of-branch records are indistinguishable to the caller.
    pub fn admit<T: Scoped>(&self, record: Option<T>) -> Result<T, AppError> {
        match record {
            Some(record) if self.can_see(&record) => Ok(record),
            Some(_) => {
                tracing::debug!(
                    user_id = %self.user_id,
                    kind = T::KIND.label(),
                    "record outside caller scope"
                );
                Err(AppError::NotFound(T::KIND.label()))
            }
            None => Err(AppError::NotFound(T::KIND.label())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::role::Role;

    #[derive(Debug)]
    struct Parcel {
        tenant_id: Uuid,
        from: Uuid,
        to: Uuid,
        current: Option<Uuid>,
    }

    impl Scoped for Parcel {
        const KIND: RecordKind = RecordKind::Consignment;

        fn tenant_id(&self) -> Uuid {
            self.tenant_id
        }

        fn branch_refs(&self) -> Vec<Option<Uuid>> {
            vec![Some(self.from), Some(self.to), self.current]
        }
    }

    fn ctx(tenant_id: Uuid, role: Role, branch_id: Option<Uuid>) -> AccessContext {
        AccessContext {
            tenant_id,
            user_id: Uuid::new_v4(),
            role,
            branch_id,
        }
    }

    fn not_found_message(err: AppError) -> String {
        assert!(matches!(err, AppError::NotFound(_)));
        err.to_string()
    }

    #[test]
    fn origin_and_destination_staff_can_see() {
        let tenant = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let parcel = || Parcel { tenant_id: tenant, from: a, to: c, current: Some(a) };

        assert!(ctx(tenant, Role::Staff, Some(a)).admit(Some(parcel())).is_ok());
        assert!(ctx(tenant, Role::Staff, Some(c)).admit(Some(parcel())).is_ok());
        assert!(ctx(tenant, Role::Staff, Some(b)).admit(Some(parcel())).is_err());
        assert!(ctx(tenant, Role::Admin, None).admit(Some(parcel())).is_ok());
    }

    #[test]
    fn hidden_and_missing_look_identical() {
        let tenant = Uuid::new_v4();
        let parcel = Parcel {
            tenant_id: tenant,
            from: Uuid::new_v4(),
            to: Uuid::new_v4(),
            current: None,
        };
        let outsider = ctx(tenant, Role::Staff, Some(Uuid::new_v4()));

        let hidden = not_found_message(outsider.admit(Some(parcel)).unwrap_err());
        let missing = not_found_message(outsider.admit::<Parcel>(None).unwrap_err());
        assert_eq!(hidden, missing);
    }

    #[test]
    fn other_tenant_is_hidden_even_from_superadmin() {
        let a = Uuid::new_v4();
        let parcel = Parcel {
            tenant_id: Uuid::new_v4(),
            from: a,
            to: a,
            current: Some(a),
        };
        let err = ctx(Uuid::new_v4(), Role::Superadmin, Some(a))
            .admit(Some(parcel))
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Consignment")));
    }
}
