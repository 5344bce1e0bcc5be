use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::entitlement::AccountEntitlement;

/// Which trigger adapter produced a fulfillment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
#[sqlx(type_name = "fulfillment_origin", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FulfillmentOrigin {
    Webhook,
    Verify,
    Mock,
    Selection,
}

/// Where the number of granted credits comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "credits", rename_all = "snake_case")]
pub enum CreditGrant {
    /// Use the resolved plan's `credit_grant`
    PlanDefault,
    /// Explicit count carried by the payment; always wins over the plan default
    Explicit(i64),
}

/// A payment that completed, normalized from whichever adapter observed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentEvent {
    /// Idempotency key: provider session/transaction id or a synthetic id
    pub source_id: String,
    pub account_id: Uuid,
    pub plan_id: Option<String>,
    pub granted_credits: CreditGrant,
    pub is_renewal: bool,
    /// Plan to switch to while renewing
    pub new_plan_id: Option<String>,
    pub custom_amount: Option<i64>,
    pub origin: FulfillmentOrigin,
}

/// Proof that a fulfillment was applied, stored atomically with the entitlement write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdempotencyRecord {
    pub source_id: String,
    pub account_id: Uuid,
    pub origin: FulfillmentOrigin,
    pub applied_at: DateTime<Utc>,
    pub resulting_version: i64,
    pub result: AccountEntitlement,
}

impl IdempotencyRecord {
    pub fn new(event: &FulfillmentEvent, result: &AccountEntitlement) -> Self {
        Self {
            source_id: event.source_id.clone(),
            account_id: event.account_id,
            origin: event.origin,
            applied_at: Utc::now(),
            resulting_version: result.version,
            result: result.clone(),
        }
    }
}
