use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    access::{
        context::AccessContext,
        page::{DateRange, Page, PageRequest},
    },
    common::error::AppError,
    db::{
        consignment_repo::{ConsignmentFilters, NewConsignment, NewTrackingEvent},
        BranchRepository, CompanyRepository, ConsignmentRepository, CustomerRepository,
    },
    models::consignment::{
        BookConsignmentPayload, Consignment, ConsignmentListQuery, ConsignmentStatus,
        TrackingEvent, UpdateConsignmentPayload, UpdateStatusPayload,
    },
};

/// Where a status event is recorded. Branch staff report from their own
/// branch unless they name another one.
fn event_branch(ctx: &AccessContext, requested: Option<Uuid>) -> Option<Uuid> {
    requested.or(if ctx.is_privileged() { None } else { ctx.branch_id })
}

/// Only privileged roles may change where a consignment is headed.
fn check_destination_change(
    ctx: &AccessContext,
    current: Option<Uuid>,
    requested: Option<Uuid>,
) -> Result<(), AppError> {
    match requested {
        Some(to) if Some(to) != current && !ctx.is_privileged() => Err(AppError::Forbidden(
            "Only an administrator can change the destination branch.".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct ConsignmentService {
    consignment_repo: ConsignmentRepository,
    company_repo: CompanyRepository,
    branch_repo: BranchRepository,
    customer_repo: CustomerRepository,
    pool: PgPool,
}

impl ConsignmentService {
    pub fn new(
        consignment_repo: ConsignmentRepository,
        company_repo: CompanyRepository,
        branch_repo: BranchRepository,
        customer_repo: CustomerRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            consignment_repo,
            company_repo,
            branch_repo,
            customer_repo,
            pool,
        }
    }

    async fn ensure_branch(
        &self,
        ctx: &AccessContext,
        field: &str,
        branch_id: Uuid,
    ) -> Result<(), AppError> {
        if self.branch_repo.belongs_to(&self.pool, ctx.tenant_id, branch_id).await? {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "{field} does not name one of your branches."
            )))
        }
    }

    /// Books a consignment: number allocation, insert and the first
    /// tracking event share one transaction.
    pub async fn book(
        &self,
        ctx: &AccessContext,
        payload: BookConsignmentPayload,
    ) -> Result<Consignment, AppError> {
        let from_branch_id = ctx.origin_branch(payload.from_branch_id)?;
        self.ensure_branch(ctx, "fromBranchId", from_branch_id).await?;
        if let Some(to) = payload.to_branch_id {
            self.ensure_branch(ctx, "toBranchId", to).await?;
        }
        if let Some(customer_id) = payload.customer_id {
            let customer = self.customer_repo.find_by_id(&self.pool, customer_id).await?;
            if !customer.is_some_and(|c| ctx.can_see(&c)) {
                return Err(AppError::BadRequest(
                    "customerId does not name one of your customers.".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;
        let cn_number = self.company_repo.next_cn_number(&mut *tx, ctx.tenant_id).await?;
        let consignment = self
            .consignment_repo
            .insert(
                &mut *tx,
                NewConsignment {
                    tenant_id: ctx.tenant_id,
                    cn_number,
                    booking_date: payload.booking_date.unwrap_or_else(|| Utc::now().date_naive()),
                    from_branch_id,
                    to_branch_id: payload.to_branch_id,
                    customer_id: payload.customer_id,
                    consignor_name: payload.consignor_name.trim(),
                    consignor_phone: &payload.consignor_phone,
                    consignee_name: payload.consignee_name.trim(),
                    consignee_phone: &payload.consignee_phone,
                    consignee_address: payload.consignee_address.as_deref(),
                    description: payload.description.as_deref(),
                    packages: payload.packages,
                    weight_kg: payload.weight_kg,
                    freight_amount: payload.freight_amount,
                    payment_mode: payload.payment_mode,
                    created_by: ctx.user_id,
                },
            )
            .await?;
        self.consignment_repo
            .append_tracking(
                &mut *tx,
                consignment.id,
                &NewTrackingEvent {
                    tenant_id: ctx.tenant_id,
                    status: ConsignmentStatus::Booked,
                    branch_id: Some(from_branch_id),
                    remarks: None,
                    created_by: ctx.user_id,
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %ctx.tenant_id,
            consignment_id = %consignment.id,
            cn_number = consignment.cn_number,
            "consignment booked"
        );
        Ok(consignment)
    }

    pub async fn list(
        &self,
        ctx: &AccessContext,
        query: ConsignmentListQuery,
    ) -> Result<Page<Consignment>, AppError> {
        let page = PageRequest::new(query.page, query.limit)?;
        let booked = DateRange::new(query.from_date, query.to_date)?;
        let status = query
            .status
            .as_deref()
            .map(str::parse::<ConsignmentStatus>)
            .transpose()?;

        self.consignment_repo
            .list(
                ctx,
                ConsignmentFilters {
                    booked,
                    search: query.search,
                    status,
                    from_branch_id: query.from_branch_id,
                    to_branch_id: query.to_branch_id,
                    customer_id: query.customer_id,
                },
                page,
            )
            .await
    }

    pub async fn get(&self, ctx: &AccessContext, id: Uuid) -> Result<Consignment, AppError> {
        let consignment = self.consignment_repo.find_by_id(&self.pool, id).await?;
        ctx.admit(consignment)
    }

    pub async fn update(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        payload: UpdateConsignmentPayload,
    ) -> Result<Consignment, AppError> {
        if let Some(to) = payload.to_branch_id {
            self.ensure_branch(ctx, "toBranchId", to).await?;
        }

        let mut tx = self.pool.begin().await?;
        let existing = self.consignment_repo.find_by_id_for_update(&mut *tx, id).await?;
        let consignment = ctx.admit(existing)?;
        if consignment.status.is_terminal() {
            return Err(AppError::BadRequest(format!(
                "Consignment is {} and can no longer be edited.",
                consignment.status
            )));
        }
        check_destination_change(ctx, consignment.to_branch_id, payload.to_branch_id)?;

        let updated = self
            .consignment_repo
            .update_details(&mut *tx, consignment.id, &payload)
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Moves a consignment to a new status and records the event. The status
    /// change and the tracking row commit together or not at all.
    pub async fn update_status(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        payload: UpdateStatusPayload,
    ) -> Result<Consignment, AppError> {
        let next: ConsignmentStatus = payload.status.parse()?;
        if let Some(branch_id) = payload.branch_id {
            self.ensure_branch(ctx, "branchId", branch_id).await?;
        }
        let location = event_branch(ctx, payload.branch_id);

        let mut tx = self.pool.begin().await?;
        let existing = self.consignment_repo.find_by_id_for_update(&mut *tx, id).await?;
        let consignment = ctx.admit(existing)?;
        consignment.status.check_transition(next)?;

        let updated = self
            .consignment_repo
            .set_status(
                &mut *tx,
                consignment.id,
                next,
                location.or(consignment.current_branch_id),
            )
            .await?;
        self.consignment_repo
            .append_tracking(
                &mut *tx,
                consignment.id,
                &NewTrackingEvent {
                    tenant_id: ctx.tenant_id,
                    status: next,
                    branch_id: location,
                    remarks: payload.remarks.as_deref(),
                    created_by: ctx.user_id,
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            consignment_id = %updated.id,
            from = %consignment.status,
            to = %next,
            "consignment status changed"
        );
        Ok(updated)
    }

    pub async fn tracking(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Vec<TrackingEvent>, AppError> {
        let consignment = self.get(ctx, id).await?;
        self.consignment_repo.tracking_for(&self.pool, consignment.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::role::Role;

    fn ctx(role: Role, branch_id: Option<Uuid>) -> AccessContext {
        AccessContext {
            tenant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role,
            branch_id,
        }
    }

    #[test]
    fn staff_events_default_to_their_branch() {
        let own = Uuid::new_v4();
        assert_eq!(event_branch(&ctx(Role::Staff, Some(own)), None), Some(own));

        let elsewhere = Uuid::new_v4();
        assert_eq!(
            event_branch(&ctx(Role::Staff, Some(own)), Some(elsewhere)),
            Some(elsewhere)
        );
    }

    #[test]
    fn admin_events_have_no_implicit_location() {
        let home = Uuid::new_v4();
        assert_eq!(event_branch(&ctx(Role::Admin, Some(home)), None), None);
    }

    #[test]
    fn only_admins_redirect_a_consignment() {
        let (a, c) = (Uuid::new_v4(), Uuid::new_v4());
        let staff = ctx(Role::Staff, Some(c));

        assert!(matches!(
            check_destination_change(&staff, Some(c), Some(a)),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_destination_change(&staff, Some(c), Some(c)).is_ok());
        assert!(check_destination_change(&staff, Some(c), None).is_ok());
        assert!(check_destination_change(&ctx(Role::Admin, None), Some(c), Some(a)).is_ok());
    }
}
