//! Pure entitlement reconciliation.
//!
//! Every trigger adapter funnels through [`reconcile`]. It performs no I/O;
//! retries and atomic persistence belong to the fulfillment use case.

use thiserror::Error;

use super::{
    entities::{
        entitlement::{AccountEntitlement, BillingCycle, SubscriptionStatus},
        fulfillment::{CreditGrant, FulfillmentEvent, FulfillmentOrigin, IdempotencyRecord},
        plan::{CUSTOM_PLAN_ID, Plan, PlanClassification},
    },
    plan_catalog::PlanCatalog,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("No credit quantity: event has no override and no catalog plan")]
    MissingCredits,

    #[error("Granted credits must not be negative (got {0})")]
    NegativeGrant(i64),

    #[error("Event account does not match the entitlement being reconciled")]
    AccountMismatch,

    #[error("Account already has a plan")]
    PlanAlreadySelected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The event changed the entitlement; the value is the next state to persist
    Applied(AccountEntitlement),
    /// The event was applied before; the value is the stored result
    AlreadyApplied(AccountEntitlement),
}

/// Compute the entitlement that results from applying `event` to `current`.
///
/// Rules:
/// - renewals are additive on the clamped balance, optionally switching plan;
/// - bundle purchases are additive;
/// - subscription (and free) purchases replace the balance;
/// - custom or plan-less purchases are additive.
pub fn reconcile(
    current: &AccountEntitlement,
    event: &FulfillmentEvent,
    prior: Option<&IdempotencyRecord>,
    catalog: &PlanCatalog,
) -> Result<Reconciliation, ReconcileError> {
    if let Some(record) = prior {
        return Ok(Reconciliation::AlreadyApplied(record.result.clone()));
    }

    if event.account_id != current.account_id {
        return Err(ReconcileError::AccountMismatch);
    }

    // Selecting a plan without payment is only for accounts that have none;
    // checked against the state being replaced so a racing purchase survives.
    if event.origin == FulfillmentOrigin::Selection && current.plan_id.is_some() {
        return Err(ReconcileError::PlanAlreadySelected);
    }

    let plan = resolve_plan(event.plan_id.as_deref(), catalog)?;
    let switch_plan = match (event.is_renewal, event.new_plan_id.as_deref()) {
        (true, Some(id)) => resolve_plan(Some(id), catalog)?,
        _ => None,
    };

    let granted = granted_credits(event.granted_credits, switch_plan.or(plan))?;
    let base = current.credit_balance.max(0);

    let mut next = current.clone();
    next.version = current.version + 1;

    if event.is_renewal {
        next.credit_balance = base.saturating_add(granted);
        if let Some(new_plan) = switch_plan {
            next.plan_id = Some(new_plan.id.clone());
            next.billing_cycle = Some(BillingCycle::for_plan(new_plan.is_bundle()));
        }
        return Ok(Reconciliation::Applied(next));
    }

    match plan {
        Some(plan) => match plan.classification {
            PlanClassification::Bundle => {
                next.credit_balance = base.saturating_add(granted);
                next.plan_id = Some(plan.id.clone());
                next.billing_cycle = Some(BillingCycle::OneTime);
                next.subscription_status = SubscriptionStatus::Active;
            }
            PlanClassification::Subscription | PlanClassification::Free => {
                next.credit_balance = granted;
                next.plan_id = Some(plan.id.clone());
                next.billing_cycle = Some(BillingCycle::Monthly);
                next.subscription_status = SubscriptionStatus::Active;
            }
        },
        None => {
            next.credit_balance = base.saturating_add(granted);
        }
    }

    Ok(Reconciliation::Applied(next))
}

fn resolve_plan<'a>(
    plan_id: Option<&str>,
    catalog: &'a PlanCatalog,
) -> Result<Option<&'a Plan>, ReconcileError> {
    match plan_id {
        None | Some(CUSTOM_PLAN_ID) => Ok(None),
        Some(id) => catalog
            .lookup(id)
            .map(Some)
            .ok_or_else(|| ReconcileError::UnknownPlan(id.to_string())),
    }
}

fn granted_credits(grant: CreditGrant, plan: Option<&Plan>) -> Result<i64, ReconcileError> {
    let credits = match (grant, plan) {
        (CreditGrant::Explicit(n), _) => n,
        (CreditGrant::PlanDefault, Some(plan)) => plan.credit_grant,
        (CreditGrant::PlanDefault, None) => return Err(ReconcileError::MissingCredits),
    };
    if credits < 0 {
        return Err(ReconcileError::NegativeGrant(credits));
    }
    Ok(credits)
}
