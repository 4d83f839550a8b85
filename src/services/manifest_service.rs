use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    access::{
        context::AccessContext,
        page::{DateRange, Page, PageRequest},
    },
    common::error::AppError,
    db::{
        consignment_repo::NewTrackingEvent,
        manifest_repo::{ManifestFilters, NewManifest},
        BranchRepository, CompanyRepository, ConsignmentRepository, ManifestRepository,
    },
    models::{
        consignment::{Consignment, ConsignmentStatus},
        manifest::{CreateManifestPayload, Manifest, ManifestDetail, ManifestListQuery, ManifestStatus},
    },
};

/// Ids in first-seen order without repeats.
fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Every requested consignment must be visible and loadable, and must sit at
/// the dispatch branch.
fn check_loadable(
    ctx: &AccessContext,
    from_branch_id: Uuid,
    requested: &[Uuid],
    locked: &[Consignment],
) -> Result<(), AppError> {
    let visible: HashSet<Uuid> = locked
        .iter()
        .filter(|c| ctx.can_see(*c))
        .map(|c| c.id)
        .collect();
    if requested.iter().any(|id| !visible.contains(id)) {
        return Err(AppError::NotFound("Consignment"));
    }

    if let Some(blocked) = locked.iter().find(|c| !c.status.is_loadable()) {
        return Err(AppError::BadRequest(format!(
            "Consignment {} is {} and cannot be loaded.",
            blocked.cn_number, blocked.status
        )));
    }
    if let Some(elsewhere) = locked
        .iter()
        .find(|c| c.current_branch_id != Some(from_branch_id))
    {
        return Err(AppError::BadRequest(format!(
            "Consignment {} is not at the dispatch branch.",
            elsewhere.cn_number
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ManifestService {
    manifest_repo: ManifestRepository,
    consignment_repo: ConsignmentRepository,
    company_repo: CompanyRepository,
    branch_repo: BranchRepository,
    pool: PgPool,
}

impl ManifestService {
    pub fn new(
        manifest_repo: ManifestRepository,
        consignment_repo: ConsignmentRepository,
        company_repo: CompanyRepository,
        branch_repo: BranchRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            manifest_repo,
            consignment_repo,
            company_repo,
            branch_repo,
            pool,
        }
    }

    /// Dispatches a vehicle: allocates the OGPL number, links the load and
    /// puts every consignment in transit, all in one transaction.
    pub async fn create(
        &self,
        ctx: &AccessContext,
        payload: CreateManifestPayload,
    ) -> Result<Manifest, AppError> {
        let from_branch_id = ctx.origin_branch(payload.from_branch_id)?;
        if from_branch_id == payload.to_branch_id {
            return Err(AppError::BadRequest(
                "Origin and destination branch must differ.".to_string(),
            ));
        }
        for (field, id) in [("fromBranchId", from_branch_id), ("toBranchId", payload.to_branch_id)] {
            if !self.branch_repo.belongs_to(&self.pool, ctx.tenant_id, id).await? {
                return Err(AppError::BadRequest(format!(
                    "{field} does not name one of your branches."
                )));
            }
        }
        let ids = dedup_ids(&payload.consignment_ids);

        let mut tx = self.pool.begin().await?;
        let locked = self
            .consignment_repo
            .lock_many(&mut *tx, ctx.tenant_id, &ids)
            .await?;
        check_loadable(ctx, from_branch_id, &ids, &locked)?;

        let manifest_number = self
            .company_repo
            .next_manifest_number(&mut *tx, ctx.tenant_id)
            .await?;
        let manifest = self
            .manifest_repo
            .insert(
                &mut *tx,
                NewManifest {
                    tenant_id: ctx.tenant_id,
                    manifest_number,
                    from_branch_id,
                    to_branch_id: payload.to_branch_id,
                    vehicle_number: payload.vehicle_number.trim(),
                    driver_name: payload.driver_name.as_deref(),
                    driver_phone: payload.driver_phone.as_deref(),
                    created_by: ctx.user_id,
                },
            )
            .await?;
        self.manifest_repo
            .link_consignments(&mut *tx, ctx.tenant_id, manifest.id, &ids)
            .await?;
        self.consignment_repo
            .set_status_many(
                &mut *tx,
                ctx.tenant_id,
                &ids,
                &[ConsignmentStatus::Booked, ConsignmentStatus::Reached],
                ConsignmentStatus::InTransit,
                None,
            )
            .await?;

        let remarks = format!("Loaded on OGPL {} ({})", manifest.manifest_number, manifest.vehicle_number);
        self.consignment_repo
            .append_tracking_many(
                &mut *tx,
                &ids,
                &NewTrackingEvent {
                    tenant_id: ctx.tenant_id,
                    status: ConsignmentStatus::InTransit,
                    branch_id: Some(from_branch_id),
                    remarks: Some(&remarks),
                    created_by: ctx.user_id,
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %ctx.tenant_id,
            manifest_id = %manifest.id,
            manifest_number = manifest.manifest_number,
            consignments = ids.len(),
            "manifest dispatched"
        );
        Ok(manifest)
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        query: ManifestListQuery,
    ) -> Result<Page<Manifest>, AppError> {
        let page = PageRequest::new(query.page, query.limit)?;
        let dispatched = DateRange::new(query.from_date, query.to_date)?;
        let status = query
            .status
            .as_deref()
            .map(str::parse::<ManifestStatus>)
            .transpose()?;

        self.manifest_repo
            .list(
                ctx,
                ManifestFilters {
                    dispatched,
                    search: query.search,
                    status,
                },
                page,
            )
            .await
    }

    /// The manifest with the consignments the caller may see.
    pub async fn get(&self, ctx: &AccessContext, id: Uuid) -> Result<ManifestDetail, AppError> {
        let existing = self.manifest_repo.find_by_id(&self.pool, id).await?;
        let manifest = ctx.admit(existing)?;
        let consignments = self
            .manifest_repo
            .consignments_of(&self.pool, manifest.id)
            .await?
            .into_iter()
            .filter(|c| ctx.can_see(c))
            .collect();
        Ok(ManifestDetail {
            manifest,
            consignments,
        })
    }

    /// Unloads a manifest at its destination.
    pub async fn arrive(&self, ctx: &AccessContext, id: Uuid) -> Result<Manifest, AppError> {
        let mut tx = self.pool.begin().await?;
        let existing = self.manifest_repo.find_by_id_for_update(&mut *tx, id).await?;
        let manifest = ctx.admit(existing)?;

        if !ctx.is_privileged() && ctx.branch_id != Some(manifest.to_branch_id) {
            return Err(AppError::Forbidden(
                "Only the destination branch can receive this manifest.".to_string(),
            ));
        }
        if manifest.status == ManifestStatus::Arrived {
            return Err(AppError::BadRequest("Manifest has already arrived.".to_string()));
        }

        // Statuses are read from locked rows only.
        let in_transit: Vec<Uuid> = self
            .manifest_repo
            .lock_load(&mut *tx, manifest.id)
            .await?
            .into_iter()
            .filter(|c| c.status == ConsignmentStatus::InTransit)
            .map(|c| c.id)
            .collect();
        let arrived = self.manifest_repo.mark_arrived(&mut *tx, manifest.id).await?;

        let mut ids = Vec::new();
        if !in_transit.is_empty() {
            ids = self
                .consignment_repo
                .set_status_many(
                    &mut *tx,
                    ctx.tenant_id,
                    &in_transit,
                    &[ConsignmentStatus::InTransit],
                    ConsignmentStatus::Reached,
                    Some(manifest.to_branch_id),
                )
                .await?;
            let remarks = format!("Arrived on OGPL {}", manifest.manifest_number);
            self.consignment_repo
                .append_tracking_many(
                    &mut *tx,
                    &ids,
                    &NewTrackingEvent {
                        tenant_id: ctx.tenant_id,
                        status: ConsignmentStatus::Reached,
                        branch_id: Some(manifest.to_branch_id),
                        remarks: Some(&remarks),
                        created_by: ctx.user_id,
                    },
                )
                .await?;
        }
        tx.commit().await?;

        tracing::info!(manifest_id = %arrived.id, consignments = ids.len(), "manifest arrived");
        Ok(arrived)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::{access::role::Role, models::consignment::PaymentMode};

    fn consignment(tenant_id: Uuid, from: Uuid, status: ConsignmentStatus) -> Consignment {
        let now = Utc::now();
        Consignment {
            id: Uuid::new_v4(),
            tenant_id,
            cn_number: 1,
            booking_date: now.date_naive(),
            from_branch_id: from,
            to_branch_id: None,
            current_branch_id: Some(from),
            customer_id: None,
            consignor_name: "Ramesh Traders".to_string(),
            consignor_phone: "9876543210".to_string(),
            consignee_name: "Kiran Stores".to_string(),
            consignee_phone: "9123456780".to_string(),
            consignee_address: None,
            description: None,
            packages: 1,
            weight_kg: Decimal::ONE,
            freight_amount: Decimal::ONE,
            payment_mode: PaymentMode::Paid,
            status,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    fn staff(tenant_id: Uuid, branch: Uuid) -> AccessContext {
        AccessContext {
            tenant_id,
            user_id: Uuid::new_v4(),
            role: Role::Staff,
            branch_id: Some(branch),
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(dedup_ids(&[a, b, a, b]), vec![a, b]);
    }

    #[test]
    fn missing_or_foreign_branch_consignment_is_not_found() {
        let tenant = Uuid::new_v4();
        let branch = Uuid::new_v4();
        let ctx = staff(tenant, branch);

        let mine = consignment(tenant, branch, ConsignmentStatus::Booked);
        let elsewhere = consignment(tenant, Uuid::new_v4(), ConsignmentStatus::Booked);

        let requested = [mine.id, elsewhere.id];
        let err = check_loadable(&ctx, branch, &requested, &[mine.clone(), elsewhere]).unwrap_err();
        assert!(matches!(err, AppError::NotFound("Consignment")));

        let err = check_loadable(&ctx, branch, &[mine.id, Uuid::new_v4()], &[mine]).unwrap_err();
        assert!(matches!(err, AppError::NotFound("Consignment")));
    }

    #[test]
    fn only_waiting_consignments_load() {
        let tenant = Uuid::new_v4();
        let branch = Uuid::new_v4();
        let ctx = staff(tenant, branch);

        let reached = consignment(tenant, branch, ConsignmentStatus::Reached);
        assert!(check_loadable(&ctx, branch, &[reached.id], &[reached]).is_ok());

        let moving = consignment(tenant, branch, ConsignmentStatus::InTransit);
        let err = check_loadable(&ctx, branch, &[moving.id], &[moving]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn consignment_must_be_at_the_dispatch_branch() {
        let tenant = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        // Booked at B for delivery to A: visible to A, but still sitting at B.
        let mut inbound = consignment(tenant, b, ConsignmentStatus::Booked);
        inbound.to_branch_id = Some(a);

        let err = check_loadable(&staff(tenant, a), a, &[inbound.id], &[inbound.clone()]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let admin = AccessContext {
            tenant_id: tenant,
            user_id: Uuid::new_v4(),
            role: Role::Admin,
            branch_id: None,
        };
        assert!(check_loadable(&admin, a, &[inbound.id], &[inbound.clone()]).is_err());
        assert!(check_loadable(&admin, b, &[inbound.id], &[inbound]).is_ok());
    }
}
