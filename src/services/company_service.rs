use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    access::{
        context::AccessContext,
        page::{Page, PageRequest},
        role::Role,
    },
    common::error::AppError,
    db::{user_repo::NewUser, BranchRepository, CompanyRepository, UserRepository},
    models::company::{
        Branch, BranchDraft, Company, CompanyRegistered, RegisterCompanyPayload,
        UpdateBranchPayload, UpdateCompanyPayload,
    },
    services::{
        auth::{hash_password, TokenService},
        notify::{EmailMessage, Mailer},
    },
};

/// Company onboarding and profile, plus the branch directory.
#[derive(Clone)]
pub struct CompanyService {
    company_repo: CompanyRepository,
    branch_repo: BranchRepository,
    user_repo: UserRepository,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    mail_from: String,
    pool: PgPool,
}

impl CompanyService {
    pub fn new(
        company_repo: CompanyRepository,
        branch_repo: BranchRepository,
        user_repo: UserRepository,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        mail_from: String,
        pool: PgPool,
    ) -> Self {
        Self {
            company_repo,
            branch_repo,
            user_repo,
            tokens,
            mailer,
            mail_from,
            pool,
        }
    }

    /// Creates the tenant, its head office and its first admin atomically.
    /// The welcome email goes out after commit and cannot undo the signup.
    pub async fn register(
        &self,
        payload: RegisterCompanyPayload,
    ) -> Result<CompanyRegistered, AppError> {
        let password_hash = hash_password(&payload.admin.password).await?;

        let mut tx = self.pool.begin().await?;

        let company = self.company_repo.create(&mut *tx, &payload).await?;
        let head_office = self
            .branch_repo
            .create(&mut *tx, company.id, &payload.head_office, true)
            .await?;
        let admin = self
            .user_repo
            .create(
                &mut *tx,
                NewUser {
                    tenant_id: company.id,
                    branch_id: Some(head_office.id),
                    full_name: payload.admin.full_name.trim(),
                    email: &payload.admin.email,
                    phone: &payload.admin.phone,
                    password_hash: &password_hash,
                    role: Role::Admin,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(tenant_id = %company.id, admin_id = %admin.id, "company registered");

        let welcome = EmailMessage {
            to: admin.email.clone(),
            from: self.mail_from.clone(),
            subject: format!("Welcome to TMS, {}", company.name),
            body: format!(
                "Hello {},\n\nYour company {} is ready. Sign in with {} to start booking.\n",
                admin.full_name, company.name, admin.email
            ),
        };
        if let Err(e) = self.mailer.send(&welcome).await {
            tracing::warn!(tenant_id = %company.id, error = %e, "welcome email failed");
        }

        let token = self.tokens.issue(&admin)?;
        Ok(CompanyRegistered {
            company,
            head_office,
            admin,
            token,
        })
    }

    pub async fn profile(&self, ctx: &AccessContext) -> Result<Company, AppError> {
        self.company_repo
            .find_by_id(ctx.tenant_id)
            .await?
            .ok_or(AppError::NotFound("Company"))
    }

    pub async fn update_profile(
        &self,
        ctx: &AccessContext,
        payload: UpdateCompanyPayload,
    ) -> Result<Company, AppError> {
        self.company_repo.update(ctx.tenant_id, &payload).await
    }

    // --- Branches ---

    pub async fn list_branches(
        &self,
        ctx: &AccessContext,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Branch>, AppError> {
        self.branch_repo.list(ctx, search, page).await
    }

    pub async fn get_branch(&self, ctx: &AccessContext, id: uuid::Uuid) -> Result<Branch, AppError> {
        let branch = self.branch_repo.find_by_id(&self.pool, id).await?;
        ctx.admit(branch)
    }

    pub async fn create_branch(
        &self,
        ctx: &AccessContext,
        draft: BranchDraft,
    ) -> Result<Branch, AppError> {
        let branch = self
            .branch_repo
            .create(&self.pool, ctx.tenant_id, &draft, false)
            .await?;
        tracing::info!(tenant_id = %ctx.tenant_id, branch_id = %branch.id, "branch created");
        Ok(branch)
    }

    pub async fn update_branch(
        &self,
        ctx: &AccessContext,
        id: uuid::Uuid,
        payload: UpdateBranchPayload,
    ) -> Result<Branch, AppError> {
        let existing = self.branch_repo.find_by_id(&self.pool, id).await?;
        let branch = ctx.admit(existing)?;
        self.branch_repo.update(branch.id, &payload).await
    }
}
