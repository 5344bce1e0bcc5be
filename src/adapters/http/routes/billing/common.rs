//! Shared imports and response types for billing routes.

// Core framework - re-exported for use by sibling modules
pub use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
pub use serde::{Deserialize, Serialize};
pub use uuid::Uuid;

// App-level imports
pub use crate::adapters::http::{app_state::AppState, auth::AuthenticatedAccount};
pub use crate::app_error::{AppError, AppResult};
pub use crate::application::use_cases::fulfillment::FulfillmentOutcome;
pub use crate::domain::entities::entitlement::AccountEntitlement;

/// Body returned by every route that drives a fulfillment.
///
/// A replay is still a success: the stored result is returned with
/// `alreadyApplied = true`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FulfillmentResponse {
    pub success: bool,
    pub already_applied: bool,
    pub entitlement: AccountEntitlement,
}

impl From<FulfillmentOutcome> for FulfillmentResponse {
    fn from(outcome: FulfillmentOutcome) -> Self {
        let already_applied = outcome.is_replay();
        let entitlement = match outcome {
            FulfillmentOutcome::Applied(e) | FulfillmentOutcome::AlreadyApplied(e) => e,
        };
        Self {
            success: true,
            already_applied,
            entitlement,
        }
    }
}
