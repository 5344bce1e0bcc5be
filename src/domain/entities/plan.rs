use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Plan identifier used for purchases that are not anchored to a catalog plan.
pub const CUSTOM_PLAN_ID: &str = "custom";

/// How a plan's credits interact with an existing balance.
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
#[sqlx(type_name = "plan_classification", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PlanClassification {
    /// Recurring plan; a purchase replaces the balance
    Subscription,
    /// One-time stackable credit pack; a purchase tops up the balance
    Bundle,
    /// Zero-price entry plan
    Free,
}

impl PlanClassification {
    pub fn is_bundle(&self) -> bool {
        matches!(self, PlanClassification::Bundle)
    }

    pub fn is_free(&self) -> bool {
        matches!(self, PlanClassification::Free)
    }
}

/// A catalog entry. Immutable once referenced by a purchase; only `is_active` toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub display_name: String,
    /// Price in whole currency units
    pub unit_price: i64,
    pub credit_grant: i64,
    pub classification: PlanClassification,
    pub validity_months: i32,
    pub is_active: bool,
}

impl Plan {
    pub fn is_bundle(&self) -> bool {
        self.classification.is_bundle()
    }
}
