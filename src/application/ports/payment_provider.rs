use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Metadata keys written onto checkout sessions and read back at fulfillment.
pub mod metadata_keys {
    pub const USER_ID: &str = "userId";
    pub const PLAN_ID: &str = "planId";
    pub const IS_RENEWAL: &str = "isRenewal";
    pub const INTERVIEW_COUNT: &str = "interviewCount";
    pub const NEW_PLAN_ID: &str = "newPlanId";
    pub const CUSTOM_AMOUNT: &str = "customAmount";
}

/// What a fulfillment needs to know about a purchase, attached at checkout time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutMetadata {
    pub account_id: Uuid,
    pub plan_id: Option<String>,
    pub is_renewal: bool,
    pub interview_count: Option<i64>,
    pub new_plan_id: Option<String>,
    pub custom_amount: Option<i64>,
}

impl CheckoutMetadata {
    /// Flatten into provider metadata (string key/value pairs).
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(metadata_keys::USER_ID.to_string(), self.account_id.to_string());
        map.insert(metadata_keys::IS_RENEWAL.to_string(), self.is_renewal.to_string());
        if let Some(plan_id) = &self.plan_id {
            map.insert(metadata_keys::PLAN_ID.to_string(), plan_id.clone());
        }
        if let Some(count) = self.interview_count {
            map.insert(metadata_keys::INTERVIEW_COUNT.to_string(), count.to_string());
        }
        if let Some(new_plan_id) = &self.new_plan_id {
            map.insert(metadata_keys::NEW_PLAN_ID.to_string(), new_plan_id.clone());
        }
        if let Some(amount) = self.custom_amount {
            map.insert(metadata_keys::CUSTOM_AMOUNT.to_string(), amount.to_string());
        }
        map
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub product_name: String,
    /// Whole currency units
    pub amount: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub session_id: String,
    pub url: Option<String>,
}

/// Provider-side view of a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// The external payment provider. Card handling and checkout UI live there.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult>;

    /// Fetch a session; `AppError::NotFound` when the provider does not know it.
    async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<CheckoutSession>;
}
