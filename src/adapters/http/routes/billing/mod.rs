//! Billing routes.
//!
//! Every route that grants credits funnels through the same fulfillment use
//! case; they differ only in how the caller is authenticated and how the
//! payment is described.
//!
//! # Route Groups
//!
//! - **Catalog** (3 routes): plans, current entitlement, free-plan selection
//! - **Checkout** (2 routes): start a hosted checkout, verify it after redirect
//! - **Webhooks** (1 route): signed provider notifications
//! - **Renewal** (2 routes): quote and renew
//! - **Mock** (1 route): provider-less fulfillment for test deployments

mod catalog;
mod checkout;
mod common;
mod mock;
mod renewal;
mod webhooks;

use crate::adapters::http::app_state::AppState;
use axum::Router;

/// Returns the combined router for all billing routes.
pub fn router() -> Router<AppState> {
    catalog::router()
        .merge(checkout::router())
        .merge(webhooks::router())
        .merge(renewal::router())
        .merge(mock::router())
}
