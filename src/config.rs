use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        BranchRepository, CompanyRepository, ConsignmentRepository, CustomerRepository,
        DashboardRepository, ManifestRepository, UserRepository,
    },
    services::{
        auth::{AuthService, OtpPolicy, TokenService},
        company_service::CompanyService,
        consignment_service::ConsignmentService,
        customer_service::CustomerService,
        dashboard_service::DashboardService,
        document_service::DocumentService,
        manifest_service::ManifestService,
        notify::{Mailer, SmsSender},
        user_service::UserService,
    },
};

/// Environment configuration. Every variable and its default lives here.
#[derive(Debug, Clone)]
pub struct Config {
    /// Required.
    pub database_url: String,
    /// HS256 signing secret. Required.
    pub jwt_secret: String,
    /// Default: 0.0.0.0:3000
    pub bind_addr: String,
    /// Default: 5
    pub db_max_connections: u32,
    /// Default: 12
    pub token_ttl_hours: i64,
    /// Whole-request deadline enforced by the HTTP layer. Default: 30
    pub request_timeout_secs: u64,
    /// Default: 10
    pub otp_ttl_minutes: i64,
    /// Default: 5
    pub otp_max_attempts: i32,
    /// "console" or "smtp". Default: console
    pub mail_adapter: String,
    pub mail_from: String,
    /// Required when mail_adapter=smtp.
    pub smtp_host: Option<String>,
    /// Default: 587
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    /// Only "console" ships. Default: console
    pub sms_adapter: String,
    /// Directory holding the Roboto TTF family for printed notes.
    /// Default: ./fonts
    pub fonts_dir: PathBuf,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 16 {
            anyhow::bail!("JWT_SECRET must be at least 16 characters");
        }

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            token_ttl_hours: parse_or("TOKEN_TTL_HOURS", 12)?,
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30)?,
            otp_ttl_minutes: parse_or("OTP_TTL_MINUTES", 10)?,
            otp_max_attempts: parse_or("OTP_MAX_ATTEMPTS", 5)?,
            mail_adapter: env::var("MAIL_ADAPTER").unwrap_or_else(|_| "console".to_string()),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "no-reply@tms.local".to_string()),
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_port: parse_or("SMTP_PORT", 587)?,
            smtp_user: env::var("SMTP_USER").ok(),
            smtp_pass: env::var("SMTP_PASS").ok(),
            sms_adapter: env::var("SMS_ADAPTER").unwrap_or_else(|_| "console".to_string()),
            fonts_dir: env::var("FONTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./fonts")),
        })
    }

    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/tms_test".to_string(),
            jwt_secret: "test-secret-that-is-long-enough".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            db_max_connections: 2,
            token_ttl_hours: 1,
            request_timeout_secs: 5,
            otp_ttl_minutes: 10,
            otp_max_attempts: 3,
            mail_adapter: "console".to_string(),
            mail_from: "test@example.com".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            sms_adapter: "console".to_string(),
            fonts_dir: PathBuf::from("./fonts"),
        }
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&self.database_url)
            .await
            .context("failed to connect to the database")?;
        tracing::info!("database connection established");
        Ok(pool)
    }
}

/// Shared application state: the pool, config and every service, built once.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub auth_service: AuthService,
    pub company_service: CompanyService,
    pub user_service: UserService,
    pub customer_service: CustomerService,
    pub consignment_service: ConsignmentService,
    pub manifest_service: ManifestService,
    pub dashboard_service: DashboardService,
    pub document_service: DocumentService,
}

impl AppState {
    /// Wires repositories into services. Side-effecting collaborators are
    /// passed in so tests can substitute them.
    pub fn new(
        db_pool: PgPool,
        config: Config,
        mailer: Arc<dyn Mailer>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_hours);

        let user_repo = UserRepository::new(db_pool.clone());
        let company_repo = CompanyRepository::new(db_pool.clone());
        let branch_repo = BranchRepository::new(db_pool.clone());
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let consignment_repo = ConsignmentRepository::new(db_pool.clone());
        let manifest_repo = ManifestRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        let otp_policy = OtpPolicy {
            ttl_minutes: config.otp_ttl_minutes,
            max_attempts: config.otp_max_attempts,
        };

        let auth_service = AuthService::new(
            user_repo.clone(),
            tokens.clone(),
            sms,
            otp_policy,
            db_pool.clone(),
        );
        let company_service = CompanyService::new(
            company_repo.clone(),
            branch_repo.clone(),
            user_repo.clone(),
            tokens.clone(),
            mailer,
            config.mail_from.clone(),
            db_pool.clone(),
        );
        let user_service = UserService::new(user_repo, branch_repo.clone(), db_pool.clone());
        let customer_service = CustomerService::new(customer_repo.clone(), db_pool.clone());
        let consignment_service = ConsignmentService::new(
            consignment_repo.clone(),
            company_repo.clone(),
            branch_repo.clone(),
            customer_repo,
            db_pool.clone(),
        );
        let manifest_service = ManifestService::new(
            manifest_repo,
            consignment_repo,
            company_repo.clone(),
            branch_repo.clone(),
            db_pool.clone(),
        );
        let dashboard_service = DashboardService::new(dashboard_repo);
        let document_service = DocumentService::new(
            company_repo,
            branch_repo,
            db_pool.clone(),
            config.fonts_dir.clone(),
        );

        Self {
            db_pool,
            config: Arc::new(config),
            tokens,
            auth_service,
            company_service,
            user_service,
            customer_service,
            consignment_service,
            manifest_service,
            dashboard_service,
            document_service,
        }
    }
}
