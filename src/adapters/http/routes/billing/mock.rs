//! Provider-less fulfillment for test deployments.
//!
//! Answers 404 unless `MOCK_PAYMENTS_ENABLED` is set. Goes through the
//! normalizer and the same fulfillment path as a real payment.

use super::common::*;
use crate::application::fulfillment_normalizer::{FlexibleInt, MockFulfillment};

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Clients also send `planName` and `isBundle` here; both are display-only
/// and ignored, the catalog decides what a plan is.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MockMetadata {
    interview_count: Option<FlexibleInt>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MockPaymentPayload {
    plan_id: Option<String>,
    #[serde(default)]
    is_renewal: bool,
    custom_amount: Option<FlexibleInt>,
    interview_count: Option<FlexibleInt>,
    new_plan_id: Option<String>,
    #[serde(default)]
    metadata: MockMetadata,
}

/// POST /api/billing/mock-payment
async fn mock_payment(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    headers: HeaderMap,
    Json(payload): Json<MockPaymentPayload>,
) -> AppResult<impl IntoResponse> {
    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let request = MockFulfillment {
        plan_id: payload.plan_id,
        is_renewal: payload.is_renewal,
        custom_amount: payload.custom_amount,
        interview_count: payload.interview_count.or(payload.metadata.interview_count),
        new_plan_id: payload.new_plan_id,
    };

    let outcome = app_state
        .billing_use_cases
        .fulfill_mock(account_id, idempotency_key, request)
        .await?;
    Ok(Json(FulfillmentResponse::from(outcome)))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/mock-payment", post(mock_payment))
}
