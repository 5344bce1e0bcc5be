use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

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
#[sqlx(type_name = "billing_cycle", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum BillingCycle {
    Monthly,
    OneTime,
}

impl BillingCycle {
    /// Cycle implied by purchasing a plan of the given kind.
    pub fn for_plan(is_bundle: bool) -> Self {
        if is_bundle {
            BillingCycle::OneTime
        } else {
            BillingCycle::Monthly
        }
    }
}

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
    Default,
)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubscriptionStatus {
    #[default]
    Trial,
    Active,
    Cancelled,
    Expired,
}

/// Per-account plan and credit state.
///
/// `version` is the optimistic concurrency token: it increments on every
/// successful mutation and gates the conditional write. Version 0 means the
/// account has never been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntitlement {
    pub account_id: Uuid,
    pub plan_id: Option<String>,
    pub billing_cycle: Option<BillingCycle>,
    pub subscription_status: SubscriptionStatus,
    pub credit_balance: i64,
    pub version: i64,
}

impl AccountEntitlement {
    /// State of a freshly registered account.
    pub fn registered(account_id: Uuid) -> Self {
        Self {
            account_id,
            plan_id: None,
            billing_cycle: None,
            subscription_status: SubscriptionStatus::Trial,
            credit_balance: 0,
            version: 0,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }
}
