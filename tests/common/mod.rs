#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tms_backend::{
    access::{context::AccessContext, role::Role},
    config::{AppState, Config},
    create_router,
    models::{
        auth::User,
        company::{AdminDraft, BranchDraft, CompanyRegistered, RegisterCompanyPayload},
        consignment::{BookConsignmentPayload, PaymentMode},
        user::CreateUserPayload,
    },
    services::notify::{ConsoleMailer, ConsoleSms},
};
use uuid::Uuid;

pub fn state_with_pool(pool: PgPool) -> AppState {
    AppState::new(
        pool,
        Config::for_tests(),
        Arc::new(ConsoleMailer),
        Arc::new(ConsoleSms),
    )
}

/// State whose pool never connects until a query runs. Requests that fail
/// before touching the database complete without a server.
pub fn offline_state() -> AppState {
    let config = Config::for_tests();
    let pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(200))
        .connect_lazy(&config.database_url)
        .unwrap();
    state_with_pool(pool)
}

pub fn offline_router() -> axum::Router {
    create_router(offline_state())
}

pub fn token_for(state: &AppState, tenant_id: Uuid, role: Role, branch_id: Option<Uuid>) -> String {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        tenant_id,
        branch_id,
        full_name: "Test User".to_string(),
        email: "test.user@example.com".to_string(),
        phone: "+919800000000".to_string(),
        password_hash: String::new(),
        role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.tokens.issue(&user).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Seeding through the services ---

pub fn ctx_for(user: &User) -> AccessContext {
    AccessContext {
        tenant_id: user.tenant_id,
        user_id: user.id,
        role: user.role,
        branch_id: user.branch_id,
    }
}

/// Registers a company. `tag` keeps emails and phones unique across tenants.
pub async fn register_company(state: &AppState, tag: u32) -> CompanyRegistered {
    state
        .company_service
        .register(RegisterCompanyPayload {
            company_name: format!("Carrier {tag}"),
            email: format!("ops{tag}@carrier.test"),
            phone: format!("+91900000{tag:04}"),
            gst_number: None,
            address: None,
            head_office: BranchDraft {
                name: "Head Office".to_string(),
                code: "HO".to_string(),
                city: "Mumbai".to_string(),
                address: None,
                phone: None,
            },
            admin: AdminDraft {
                full_name: format!("Admin {tag}"),
                email: format!("admin{tag}@carrier.test"),
                phone: format!("+91910000{tag:04}"),
                password: "admin-pass".to_string(),
            },
        })
        .await
        .unwrap()
}

pub async fn add_branch(state: &AppState, admin: &AccessContext, code: &str) -> Uuid {
    state
        .company_service
        .create_branch(
            admin,
            BranchDraft {
                name: format!("Branch {code}"),
                code: code.to_string(),
                city: "Pune".to_string(),
                address: None,
                phone: None,
            },
        )
        .await
        .unwrap()
        .id
}

pub async fn add_staff(
    state: &AppState,
    admin: &AccessContext,
    branch_id: Uuid,
    tag: u32,
) -> AccessContext {
    let user = state
        .user_service
        .create(
            admin,
            CreateUserPayload {
                full_name: format!("Staff {tag}"),
                email: format!("staff{tag}@carrier.test"),
                phone: format!("+91920000{tag:04}"),
                password: "staff-pass".to_string(),
                role: Role::Staff,
                branch_id: Some(branch_id),
            },
        )
        .await
        .unwrap();
    ctx_for(&user)
}

pub fn booking(from: Option<Uuid>, to: Option<Uuid>) -> BookConsignmentPayload {
    BookConsignmentPayload {
        from_branch_id: from,
        to_branch_id: to,
        customer_id: None,
        booking_date: None,
        consignor_name: "Ramesh Traders".to_string(),
        consignor_phone: "9876543210".to_string(),
        consignee_name: "Kiran Stores".to_string(),
        consignee_phone: "9123456780".to_string(),
        consignee_address: None,
        description: Some("Machine parts".to_string()),
        packages: 2,
        weight_kg: Decimal::new(4250, 2),
        freight_amount: Decimal::new(120000, 2),
        payment_mode: PaymentMode::ToPay,
    }
}
