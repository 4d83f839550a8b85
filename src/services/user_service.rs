use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    access::{
        context::AccessContext,
        page::{Page, PageRequest},
        role::Role,
    },
    common::error::AppError,
    db::{
        user_repo::{NewUser, UserChanges, UserFilters},
        BranchRepository, UserRepository,
    },
    models::{
        auth::User,
        user::{CreateUserPayload, UpdateUserPayload, UserListQuery},
    },
    services::auth::hash_password,
};

/// Branch-scoped roles must be pinned to a branch.
fn check_assignment(role: Role, branch_id: Option<Uuid>) -> Result<(), AppError> {
    if !role.is_privileged() && branch_id.is_none() {
        return Err(AppError::BadRequest(format!(
            "Role {role} requires a branch assignment."
        )));
    }
    Ok(())
}

/// Only a superadmin may hand out the superadmin role.
fn check_grant(actor: Role, granted: Role) -> Result<(), AppError> {
    if granted == Role::Superadmin && actor != Role::Superadmin {
        return Err(AppError::Forbidden(
            "Only a superadmin can grant the superadmin role.".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    branch_repo: BranchRepository,
    pool: PgPool,
}

impl UserService {
    pub fn new(user_repo: UserRepository, branch_repo: BranchRepository, pool: PgPool) -> Self {
        Self {
            user_repo,
            branch_repo,
            pool,
        }
    }

    async fn ensure_branch(&self, ctx: &AccessContext, branch_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(id) = branch_id {
            if !self.branch_repo.belongs_to(&self.pool, ctx.tenant_id, id).await? {
                return Err(AppError::BadRequest("branchId does not name one of your branches.".to_string()));
            }
        }
        Ok(())
    }

    pub async fn create(&self, ctx: &AccessContext, payload: CreateUserPayload) -> Result<User, AppError> {
        check_grant(ctx.role, payload.role)?;
        check_assignment(payload.role, payload.branch_id)?;
        self.ensure_branch(ctx, payload.branch_id).await?;

        let password_hash = hash_password(&payload.password).await?;
        let user = self
            .user_repo
            .create(
                &self.pool,
                NewUser {
                    tenant_id: ctx.tenant_id,
                    branch_id: payload.branch_id,
                    full_name: payload.full_name.trim(),
                    email: &payload.email,
                    phone: &payload.phone,
                    password_hash: &password_hash,
                    role: payload.role,
                },
            )
            .await?;

        tracing::info!(tenant_id = %ctx.tenant_id, user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn get(&self, ctx: &AccessContext, id: Uuid) -> Result<User, AppError> {
        let user = self.user_repo.find_by_id(&self.pool, id).await?;
        ctx.admit(user)
    }

    pub async fn list(&self, ctx: &AccessContext, query: UserListQuery) -> Result<Page<User>, AppError> {
        let page = PageRequest::new(query.page, query.limit)?;
        let role = query
            .role
            .as_deref()
            .map(|r| r.parse::<Role>().map_err(AppError::BadRequest))
            .transpose()?;

        self.user_repo
            .list(
                ctx,
                UserFilters {
                    search: query.search,
                    role,
                    branch_id: query.branch_id,
                },
                page,
            )
            .await
    }

    pub async fn update(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        payload: UpdateUserPayload,
    ) -> Result<User, AppError> {
        let mut tx = self.pool.begin().await?;
        let existing = self.user_repo.find_by_id(&mut *tx, id).await?;
        let user = ctx.admit(existing)?;

        if user.role == Role::Superadmin && ctx.role != Role::Superadmin {
            return Err(AppError::Forbidden(
                "Only a superadmin can modify a superadmin.".to_string(),
            ));
        }
        if let Some(role) = payload.role {
            check_grant(ctx.role, role)?;
        }
        if user.id == ctx.user_id && payload.is_active == Some(false) {
            return Err(AppError::BadRequest("You cannot deactivate your own account.".to_string()));
        }

        let branch_change = if payload.clear_branch {
            Some(None)
        } else {
            payload.branch_id.map(Some)
        };
        let effective_role = payload.role.unwrap_or(user.role);
        let effective_branch = branch_change.unwrap_or(user.branch_id);
        check_assignment(effective_role, effective_branch)?;
        if let Some(Some(branch_id)) = branch_change {
            if !self.branch_repo.belongs_to(&mut *tx, ctx.tenant_id, branch_id).await? {
                return Err(AppError::BadRequest("branchId does not name one of your branches.".to_string()));
            }
        }

        let updated = self
            .user_repo
            .update(
                &mut *tx,
                user.id,
                UserChanges {
                    full_name: payload.full_name.as_deref().map(str::trim),
                    role: payload.role,
                    branch_id: branch_change,
                    is_active: payload.is_active,
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!(tenant_id = %ctx.tenant_id, user_id = %updated.id, "user updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_roles_need_a_branch() {
        assert!(check_assignment(Role::Staff, None).is_err());
        assert!(check_assignment(Role::BranchManager, None).is_err());
        assert!(check_assignment(Role::Staff, Some(Uuid::new_v4())).is_ok());
        assert!(check_assignment(Role::Admin, None).is_ok());
    }

    #[test]
    fn only_superadmin_grants_superadmin() {
        assert!(matches!(
            check_grant(Role::Admin, Role::Superadmin),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_grant(Role::Superadmin, Role::Superadmin).is_ok());
        assert!(check_grant(Role::Admin, Role::Staff).is_ok());
    }
}
