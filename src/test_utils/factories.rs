//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    application::ports::payment_provider::{CheckoutMetadata, CheckoutSession},
    domain::{
        entities::{
            entitlement::{AccountEntitlement, SubscriptionStatus},
            fulfillment::{CreditGrant, FulfillmentEvent, FulfillmentOrigin},
            plan::{Plan, PlanClassification},
        },
        plan_catalog::PlanCatalog,
    },
};

/// Create a test plan: a monthly subscription granting 5 credits for 499.
pub fn create_test_plan(id: &str, overrides: impl FnOnce(&mut Plan)) -> Plan {
    let mut plan = Plan {
        id: id.to_string(),
        display_name: format!("{} plan", id),
        unit_price: 499,
        credit_grant: 5,
        classification: PlanClassification::Subscription,
        validity_months: 1,
        is_active: true,
    };
    overrides(&mut plan);
    plan
}

/// Create a persisted entitlement (version 1) with no plan and no credits.
pub fn create_test_entitlement(
    account_id: Uuid,
    overrides: impl FnOnce(&mut AccountEntitlement),
) -> AccountEntitlement {
    let mut entitlement = AccountEntitlement {
        account_id,
        plan_id: None,
        billing_cycle: None,
        subscription_status: SubscriptionStatus::Trial,
        credit_balance: 0,
        version: 1,
    };
    overrides(&mut entitlement);
    entitlement
}

/// Create a webhook fulfillment for the `starter` plan.
pub fn create_test_event(
    account_id: Uuid,
    overrides: impl FnOnce(&mut FulfillmentEvent),
) -> FulfillmentEvent {
    let mut event = FulfillmentEvent {
        source_id: "sess_test".to_string(),
        account_id,
        plan_id: Some("starter".to_string()),
        granted_credits: CreditGrant::PlanDefault,
        is_renewal: false,
        new_plan_id: None,
        custom_amount: None,
        origin: FulfillmentOrigin::Webhook,
    };
    overrides(&mut event);
    event
}

/// Catalog used across tests:
///
/// | id      | kind         | price | credits |
/// |---------|--------------|-------|---------|
/// | starter | subscription | 499   | 5       |
/// | pro     | subscription | 999   | 12      |
/// | bundle5 | bundle       | 200   | 5       |
/// | free    | free         | 0     | 2       |
/// | legacy  | subscription | 299   | 3, retired |
pub fn test_plans() -> Vec<Plan> {
    vec![
        create_test_plan("starter", |_| {}),
        create_test_plan("pro", |p| {
            p.unit_price = 999;
            p.credit_grant = 12;
        }),
        create_test_plan("bundle5", |p| {
            p.classification = PlanClassification::Bundle;
            p.unit_price = 200;
            p.validity_months = 0;
        }),
        create_test_plan("free", |p| {
            p.classification = PlanClassification::Free;
            p.unit_price = 0;
            p.credit_grant = 2;
        }),
        create_test_plan("legacy", |p| {
            p.unit_price = 299;
            p.credit_grant = 3;
            p.is_active = false;
        }),
    ]
}

pub fn create_test_catalog() -> PlanCatalog {
    PlanCatalog::new(test_plans())
}

/// Create a paid provider session whose metadata buys `plan_id` for `account_id`.
pub fn create_test_session(
    session_id: &str,
    account_id: Uuid,
    plan_id: &str,
    overrides: impl FnOnce(&mut CheckoutSession),
) -> CheckoutSession {
    let metadata = CheckoutMetadata {
        account_id,
        plan_id: Some(plan_id.to_string()),
        is_renewal: false,
        interview_count: None,
        new_plan_id: None,
        custom_amount: None,
    };
    let mut session = CheckoutSession {
        id: session_id.to_string(),
        payment_status: "paid".to_string(),
        amount_total: Some(49_900),
        metadata: metadata.to_map(),
    };
    overrides(&mut session);
    session
}

/// Metadata map as the provider would echo it back.
pub fn test_metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
