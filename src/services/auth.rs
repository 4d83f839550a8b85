use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sqlx::PgPool;

use crate::{
    access::context::AccessContext,
    common::error::AppError,
    db::UserRepository,
    models::auth::{AuthResponse, Claims, User},
    services::notify::SmsSender,
};

/// Hashes on the blocking pool; bcrypt is CPU-bound.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("hashing task failed: {e}"))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))??;
    Ok(valid)
}

/// Issues and verifies session tokens (HS256).
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            tenant_id: user.tenant_id,
            role: user.role,
            branch_id: user.branch_id,
            exp: (now + self.ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                AppError::InvalidToken
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    pub ttl_minutes: i64,
    pub max_attempts: i32,
}

fn generate_otp() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    tokens: TokenService,
    sms: Arc<dyn SmsSender>,
    otp: OtpPolicy,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        tokens: TokenService,
        sms: Arc<dyn SmsSender>,
        otp: OtpPolicy,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            tokens,
            sms,
            otp,
            pool,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? || !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "password login");
        let token = self.tokens.issue(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Sends a login code when the phone belongs to an active user. The
    /// outcome is not revealed to the caller.
    pub async fn request_otp(&self, phone: &str) -> Result<(), AppError> {
        let Some(user) = self.user_repo.find_by_phone(phone).await? else {
            tracing::debug!("otp requested for unknown phone");
            return Ok(());
        };
        if !user.is_active {
            return Ok(());
        }

        let code = generate_otp();
        let code_hash = hash_password(&code).await?;
        let expires_at = Utc::now() + Duration::minutes(self.otp.ttl_minutes);
        self.user_repo
            .replace_otp(&self.pool, user.id, &code_hash, expires_at)
            .await?;

        let text = format!(
            "{code} is your login code. It expires in {} minutes.",
            self.otp.ttl_minutes
        );
        if let Err(e) = self.sms.send(&user.phone, &text).await {
            tracing::warn!(user_id = %user.id, error = %e, "failed to deliver otp");
        }
        Ok(())
    }

    pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_phone(phone)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AppError::InvalidOtp)?;

        let mut tx = self.pool.begin().await?;
        let otp = self
            .user_repo
            .pending_otp_for_update(&mut *tx, user.id)
            .await?
            .ok_or(AppError::InvalidOtp)?;

        if otp.attempts >= self.otp.max_attempts {
            self.user_repo.consume_otp(&mut *tx, otp.id).await?;
            tx.commit().await?;
            return Err(AppError::InvalidOtp);
        }

        if !verify_password(code, &otp.code_hash).await? {
            self.user_repo.record_otp_attempt(&mut *tx, otp.id).await?;
            tx.commit().await?;
            return Err(AppError::InvalidOtp);
        }

        self.user_repo.consume_otp(&mut *tx, otp.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "otp login");
        let token = self.tokens.issue(&user)?;
        Ok(AuthResponse { token, user })
    }

    pub async fn me(&self, ctx: &AccessContext) -> Result<User, AppError> {
        let user = self.user_repo.find_by_id(&self.pool, ctx.user_id).await?;
        ctx.admit(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::role::Role;
    use uuid::Uuid;

    fn user(role: Role, branch_id: Option<Uuid>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            branch_id,
            full_name: "Asha Verma".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+919876543210".to_string(),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn token_round_trip_keeps_scope() {
        let tokens = TokenService::new("unit-test-secret-0123456789", 1);
        let u = user(Role::BranchManager, Some(Uuid::new_v4()));

        let claims = tokens.verify(&tokens.issue(&u).unwrap()).unwrap();
        assert_eq!(claims.sub, u.id);
        assert_eq!(claims.tenant_id, u.tenant_id);
        assert_eq!(claims.role, Role::BranchManager);
        assert_eq!(claims.branch_id, u.branch_id);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = TokenService::new("first-secret-0123456789", 1);
        let verifier = TokenService::new("second-secret-0123456789", 1);
        let token = issuer.issue(&user(Role::Admin, None)).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new("unit-test-secret-0123456789", -2);
        let token = tokens.issue(&user(Role::Staff, None)).unwrap();
        assert!(matches!(tokens.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hashed = hash_password("s3cret-pass").await.unwrap();
        assert!(verify_password("s3cret-pass", &hashed).await.unwrap());
        assert!(!verify_password("wrong-pass", &hashed).await.unwrap());
    }
}
