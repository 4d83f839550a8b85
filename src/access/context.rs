use uuid::Uuid;

use crate::{
    access::{role::Role, visibility::{RecordKind, Visibility}},
    common::error::AppError,
    models::auth::Claims,
};

/// Optional client hint naming the tenant it believes it is acting for.
pub const TENANT_HINT_HEADER: &str = "x-tenant-id";

/// Who is acting, for which tenant, from which branch.
///
/// Built only from verified token claims. A client-supplied tenant hint is
/// checked against the claims and never merged into them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub branch_id: Option<Uuid>,
}

impl AccessContext {
    pub fn resolve(claims: &Claims, tenant_hint: Option<&str>) -> Result<Self, AppError> {
        if let Some(raw) = tenant_hint {
            let hinted = Uuid::parse_str(raw.trim()).map_err(|_| {
                AppError::BadRequest("X-Tenant-ID header is not a valid UUID.".to_string())
            })?;
            if hinted != claims.tenant_id {
                tracing::warn!(
                    user_id = %claims.sub,
                    session_tenant = %claims.tenant_id,
                    hinted_tenant = %hinted,
                    "tenant hint conflicts with session"
                );
                return Err(AppError::Forbidden(
                    "X-Tenant-ID does not match the authenticated session.".to_string(),
                ));
            }
        }

        Ok(Self {
            tenant_id: claims.tenant_id,
            user_id: claims.sub,
            role: claims.role,
            branch_id: claims.branch_id,
        })
    }

    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    pub fn visibility(&self, kind: RecordKind) -> Visibility {
        Visibility::compute(self.role, self.branch_id, kind)
    }

    /// Branch a new booking or manifest originates from.
    ///
    /// Privileged callers must name one; branch-scoped callers always act from
    /// their own branch.
    pub fn origin_branch(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        if self.is_privileged() {
            return requested
                .ok_or_else(|| AppError::BadRequest("fromBranchId is required.".to_string()));
        }

        let own = self.branch_id.ok_or_else(|| {
            AppError::Forbidden("Your account is not assigned to a branch.".to_string())
        })?;

        match requested {
            Some(other) if other != own => Err(AppError::Forbidden(
                "You can only act on behalf of your own branch.".to_string(),
            )),
            _ => Ok(own),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role, branch_id: Option<Uuid>) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            role,
            branch_id,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn session_tenant_wins_without_hint() {
        let c = claims(Role::Staff, Some(Uuid::new_v4()));
        let ctx = AccessContext::resolve(&c, None).unwrap();
        assert_eq!(ctx.tenant_id, c.tenant_id);
        assert_eq!(ctx.user_id, c.sub);
        assert_eq!(ctx.branch_id, c.branch_id);
    }

    #[test]
    fn matching_hint_is_accepted() {
        let c = claims(Role::Admin, None);
        let hint = c.tenant_id.to_string();
        let ctx = AccessContext::resolve(&c, Some(&hint)).unwrap();
        assert_eq!(ctx.tenant_id, c.tenant_id);
    }

    #[test]
    fn conflicting_hint_is_rejected() {
        let c = claims(Role::Superadmin, None);
        let other = Uuid::new_v4().to_string();
        let err = AccessContext::resolve(&c, Some(&other)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn malformed_hint_is_bad_request() {
        let c = claims(Role::Staff, None);
        let err = AccessContext::resolve(&c, Some("tenant-42")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn staff_origin_is_their_branch() {
        let branch = Uuid::new_v4();
        let ctx = AccessContext::resolve(&claims(Role::Staff, Some(branch)), None).unwrap();
        assert_eq!(ctx.origin_branch(None).unwrap(), branch);
        assert_eq!(ctx.origin_branch(Some(branch)).unwrap(), branch);
        assert!(matches!(
            ctx.origin_branch(Some(Uuid::new_v4())),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn branchless_staff_cannot_originate() {
        let ctx = AccessContext::resolve(&claims(Role::BranchManager, None), None).unwrap();
        assert!(matches!(ctx.origin_branch(None), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn admin_must_name_origin() {
        let ctx = AccessContext::resolve(&claims(Role::Admin, None), None).unwrap();
        assert!(matches!(ctx.origin_branch(None), Err(AppError::BadRequest(_))));
        let branch = Uuid::new_v4();
        assert_eq!(ctx.origin_branch(Some(branch)).unwrap(), branch);
    }
}
