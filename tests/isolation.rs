//! Tenant and branch isolation against a real database.

mod common;

use std::{collections::HashSet, time::Duration};

use axum::http::StatusCode;
use sqlx::PgPool;
use tms_backend::{
    access::role::Role,
    common::error::AppError,
    create_router,
    models::{
        consignment::{ConsignmentListQuery, ConsignmentStatus, UpdateStatusPayload},
        customer::{CreateCustomerPayload, CustomerListQuery},
        manifest::{CreateManifestPayload, ManifestStatus},
    },
};
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::*;

fn status(status: &str) -> UpdateStatusPayload {
    UpdateStatusPayload {
        status: status.to_string(),
        remarks: None,
        branch_id: None,
    }
}

fn manifest_to(to_branch_id: Uuid, consignment_ids: Vec<Uuid>) -> CreateManifestPayload {
    CreateManifestPayload {
        from_branch_id: None,
        to_branch_id,
        vehicle_number: "KA01AB4321".to_string(),
        driver_name: None,
        driver_phone: None,
        consignment_ids,
    }
}

fn searching(term: &str) -> ConsignmentListQuery {
    ConsignmentListQuery {
        search: Some(term.to_string()),
        ..Default::default()
    }
}

fn customer(phone: &str) -> CreateCustomerPayload {
    CreateCustomerPayload {
        name: "Kiran Stores".to_string(),
        phone: phone.to_string(),
        email: None,
        gst_number: None,
        address: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn origin_and_destination_see_the_booking_others_do_not(pool: PgPool) {
    let state = state_with_pool(pool);
    let company = register_company(&state, 1).await;
    let admin = ctx_for(&company.admin);

    let a = add_branch(&state, &admin, "AAA").await;
    let b = add_branch(&state, &admin, "BBB").await;
    let c = add_branch(&state, &admin, "CCC").await;
    let staff_a = add_staff(&state, &admin, a, 11).await;
    let staff_b = add_staff(&state, &admin, b, 12).await;
    let staff_c = add_staff(&state, &admin, c, 13).await;

    let cn = state
        .consignment_service
        .book(&admin, booking(Some(a), Some(c)))
        .await
        .unwrap();
    assert_eq!(cn.status, ConsignmentStatus::Booked);
    assert_eq!(cn.current_branch_id, Some(a));

    for (ctx, visible) in [(&staff_a, true), (&staff_c, true), (&staff_b, false), (&admin, true)] {
        let page = state
            .consignment_service
            .list(ctx, ConsignmentListQuery::default())
            .await
            .unwrap();
        assert_eq!(page.items.iter().any(|x| x.id == cn.id), visible);
        assert_eq!(state.consignment_service.get(ctx, cn.id).await.is_ok(), visible);
    }

    let err = state
        .consignment_service
        .update_status(&staff_b, cn.id, status("picked"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Consignment")));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn tenants_never_see_each_other(pool: PgPool) {
    let state = state_with_pool(pool);
    let first = register_company(&state, 2).await;
    let second = register_company(&state, 3).await;
    let first_admin = ctx_for(&first.admin);
    let second_admin = ctx_for(&second.admin);

    let cn = state
        .consignment_service
        .book(&first_admin, booking(Some(first.head_office.id), None))
        .await
        .unwrap();

    let page = state
        .consignment_service
        .list(&second_admin, ConsignmentListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(matches!(
        state.consignment_service.get(&second_admin, cn.id).await,
        Err(AppError::NotFound(_))
    ));

    // A foreign branch cannot be used as a destination.
    let err = state
        .consignment_service
        .book(&second_admin, booking(Some(second.head_office.id), Some(first.head_office.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn hidden_record_looks_exactly_like_a_missing_one(pool: PgPool) {
    let state = state_with_pool(pool);
    let company = register_company(&state, 4).await;
    let admin = ctx_for(&company.admin);
    let a = add_branch(&state, &admin, "AAA").await;
    let b = add_branch(&state, &admin, "BBB").await;

    let cn = state
        .consignment_service
        .book(&admin, booking(Some(a), None))
        .await
        .unwrap();

    let token = token_for(&state, company.company.id, Role::Staff, Some(b));
    let app = create_router(state);

    let hidden = app
        .clone()
        .oneshot(json_request("GET", &format!("/api/consignments/{}", cn.id), Some(&token), None))
        .await
        .unwrap();
    let missing = app
        .oneshot(json_request(
            "GET",
            &format!("/api/consignments/{}", Uuid::new_v4()),
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(hidden).await, body_json(missing).await);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn same_customer_phone_in_two_tenants(pool: PgPool) {
    let state = state_with_pool(pool);
    let first = ctx_for(&register_company(&state, 5).await.admin);
    let second = ctx_for(&register_company(&state, 6).await.admin);

    let mine = state.customer_service.create(&first, customer("9811112222")).await.unwrap();
    let theirs = state.customer_service.create(&second, customer("9811112222")).await.unwrap();
    assert_ne!(mine.id, theirs.id);

    let duplicate = state
        .customer_service
        .create(&first, customer("9811112222"))
        .await
        .unwrap_err();
    assert!(matches!(duplicate, AppError::Conflict(_)));

    let listed = state
        .customer_service
        .list(&first, Default::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
    assert_eq!(listed.items[0].id, mine.id);
    assert!(state.customer_service.get(&first, theirs.id).await.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn pages_partition_the_result_set(pool: PgPool) {
    let state = state_with_pool(pool);
    let company = register_company(&state, 7).await;
    let admin = ctx_for(&company.admin);

    for _ in 0..25 {
        state
            .consignment_service
            .book(&admin, booking(Some(company.head_office.id), None))
            .await
            .unwrap();
    }

    let mut seen = HashSet::new();
    for page_no in 1..=3u32 {
        let page = state
            .consignment_service
            .list(
                &admin,
                ConsignmentListQuery {
                    page: Some(page_no),
                    limit: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let pagination = page.pagination();
        assert_eq!(pagination.total, 25);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(page.items.len(), if page_no == 3 { 5 } else { 10 });
        seen.extend(page.items.iter().map(|c| c.id));
    }
    assert_eq!(seen.len(), 25);

    let beyond = state
        .consignment_service
        .list(
            &admin,
            ConsignmentListQuery {
                page: Some(4),
                limit: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 25);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn status_change_rolls_back_when_tracking_fails(pool: PgPool) {
    let state = state_with_pool(pool.clone());
    let company = register_company(&state, 8).await;
    let admin = ctx_for(&company.admin);

    let cn = state
        .consignment_service
        .book(&admin, booking(Some(company.head_office.id), None))
        .await
        .unwrap();

    sqlx::query("ALTER TABLE tracking_events ADD CONSTRAINT block_inserts CHECK (false) NOT VALID")
        .execute(&pool)
        .await
        .unwrap();

    let result = state
        .consignment_service
        .update_status(&admin, cn.id, status("picked"))
        .await;
    assert!(result.is_err());

    let reloaded = state.consignment_service.get(&admin, cn.id).await.unwrap();
    assert_eq!(reloaded.status, ConsignmentStatus::Booked);
    let events = state.consignment_service.tracking(&admin, cn.id).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn manifest_moves_consignments_between_branches(pool: PgPool) {
    let state = state_with_pool(pool);
    let company = register_company(&state, 9).await;
    let admin = ctx_for(&company.admin);
    let a = add_branch(&state, &admin, "AAA").await;
    let c = add_branch(&state, &admin, "CCC").await;
    let staff_a = add_staff(&state, &admin, a, 21).await;
    let staff_c = add_staff(&state, &admin, c, 22).await;

    let cn = state
        .consignment_service
        .book(&staff_a, booking(None, Some(c)))
        .await
        .unwrap();
    assert_eq!(cn.from_branch_id, a);

    let manifest = state
        .manifest_service
        .create(
            &staff_a,
            CreateManifestPayload {
                from_branch_id: None,
                to_branch_id: c,
                vehicle_number: "mh12ab1234".to_string(),
                driver_name: None,
                driver_phone: None,
                consignment_ids: vec![cn.id, cn.id],
            },
        )
        .await
        .unwrap();
    assert_eq!(manifest.vehicle_number, "MH12AB1234");

    let moving = state.consignment_service.get(&staff_a, cn.id).await.unwrap();
    assert_eq!(moving.status, ConsignmentStatus::InTransit);
    assert_eq!(moving.current_branch_id, None);

    // Only the destination can receive it.
    assert!(matches!(
        state.manifest_service.arrive(&staff_a, manifest.id).await,
        Err(AppError::Forbidden(_))
    ));
    state.manifest_service.arrive(&staff_c, manifest.id).await.unwrap();

    let landed = state.consignment_service.get(&staff_c, cn.id).await.unwrap();
    assert_eq!(landed.status, ConsignmentStatus::Reached);
    assert_eq!(landed.current_branch_id, Some(c));

    let history: Vec<ConsignmentStatus> = state
        .consignment_service
        .tracking(&staff_c, cn.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.status)
        .collect();
    assert_eq!(
        history,
        vec![
            ConsignmentStatus::Booked,
            ConsignmentStatus::InTransit,
            ConsignmentStatus::Reached
        ]
    );

    let detail = state.manifest_service.get(&staff_c, manifest.id).await.unwrap();
    assert_eq!(detail.consignments.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn dispatch_only_loads_consignments_at_the_origin(pool: PgPool) {
    let state = state_with_pool(pool);
    let company = register_company(&state, 10).await;
    let admin = ctx_for(&company.admin);
    let a = add_branch(&state, &admin, "AAA").await;
    let b = add_branch(&state, &admin, "BBB").await;
    let c = add_branch(&state, &admin, "CCC").await;
    let staff_a = add_staff(&state, &admin, a, 31).await;

    // Booked at B for A: staff at A can see it, but it has not left B.
    let inbound = state
        .consignment_service
        .book(&admin, booking(Some(b), Some(a)))
        .await
        .unwrap();

    let err = state
        .manifest_service
        .create(&staff_a, manifest_to(c, vec![inbound.id]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let mut from_a = manifest_to(c, vec![inbound.id]);
    from_a.from_branch_id = Some(a);
    assert!(state.manifest_service.create(&admin, from_a).await.is_err());

    let untouched = state.consignment_service.get(&admin, inbound.id).await.unwrap();
    assert_eq!(untouched.status, ConsignmentStatus::Booked);
    assert_eq!(untouched.current_branch_id, Some(b));
    assert_eq!(
        state.consignment_service.tracking(&admin, inbound.id).await.unwrap().len(),
        1
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn arrival_never_reopens_a_concurrently_delivered_consignment(pool: PgPool) {
    let state = state_with_pool(pool.clone());
    let company = register_company(&state, 11).await;
    let admin = ctx_for(&company.admin);
    let a = add_branch(&state, &admin, "AAA").await;
    let c = add_branch(&state, &admin, "CCC").await;
    let staff_a = add_staff(&state, &admin, a, 41).await;
    let staff_c = add_staff(&state, &admin, c, 42).await;

    let cn = state
        .consignment_service
        .book(&staff_a, booking(None, Some(c)))
        .await
        .unwrap();
    let manifest_id = state
        .manifest_service
        .create(&staff_a, manifest_to(c, vec![cn.id]))
        .await
        .unwrap()
        .id;

    // Another session holds the consignment while arrival is processed.
    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM consignments WHERE id = $1 FOR UPDATE")
        .bind(cn.id)
        .execute(&mut *holder)
        .await
        .unwrap();

    let arriving = {
        let state = state.clone();
        let ctx = staff_c.clone();
        tokio::spawn(async move { state.manifest_service.arrive(&ctx, manifest_id).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;

    sqlx::query("UPDATE consignments SET status = 'delivered' WHERE id = $1")
        .bind(cn.id)
        .execute(&mut *holder)
        .await
        .unwrap();
    holder.commit().await.unwrap();

    let manifest = arriving.await.unwrap().unwrap();
    assert_eq!(manifest.status, ManifestStatus::Arrived);

    let after = state.consignment_service.get(&admin, cn.id).await.unwrap();
    assert_eq!(after.status, ConsignmentStatus::Delivered);
    let history = state.consignment_service.tracking(&admin, cn.id).await.unwrap();
    assert!(history.iter().all(|e| e.status != ConsignmentStatus::Reached));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn search_is_partial_case_insensitive_and_tenant_bound(pool: PgPool) {
    let state = state_with_pool(pool);
    let first = register_company(&state, 12).await;
    let second = register_company(&state, 13).await;
    let first_admin = ctx_for(&first.admin);
    let second_admin = ctx_for(&second.admin);

    state.customer_service.create(&first_admin, customer("9811112222")).await.unwrap();
    state.customer_service.create(&second_admin, customer("9833334444")).await.unwrap();
    state
        .consignment_service
        .book(&first_admin, booking(Some(first.head_office.id), None))
        .await
        .unwrap();
    let mut theirs = booking(Some(second.head_office.id), None);
    theirs.consignee_phone = "9833334444".to_string();
    state.consignment_service.book(&second_admin, theirs).await.unwrap();

    let foreign_phone = state
        .customer_service
        .list(
            &first_admin,
            CustomerListQuery {
                search: Some("9833334444".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(foreign_phone.total, 0);
    let foreign_booking = state
        .consignment_service
        .list(&first_admin, searching("33334444"))
        .await
        .unwrap();
    assert_eq!(foreign_booking.total, 0);

    let partial = state
        .consignment_service
        .list(&first_admin, searching("rAmEsH tR"))
        .await
        .unwrap();
    assert_eq!(partial.total, 1);

    // `%` and `_` match themselves, not any character.
    for literal in ["Ram%Traders", "Ramesh_Traders"] {
        let page = state
            .consignment_service
            .list(&first_admin, searching(literal))
            .await
            .unwrap();
        assert_eq!(page.total, 0, "{literal}");
    }
}
