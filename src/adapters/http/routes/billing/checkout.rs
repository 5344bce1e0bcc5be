//! Hosted checkout creation and the post-redirect verify call.

use super::common::*;
use crate::application::{fulfillment_normalizer::FlexibleInt, use_cases::billing::CheckoutInput};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutPayload {
    plan_id: Option<String>,
    custom_amount: Option<FlexibleInt>,
    interview_count: Option<FlexibleInt>,
}

#[derive(Deserialize)]
struct VerifyQuery {
    session_id: String,
}

/// POST /api/billing/checkout
async fn create_checkout(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    Json(payload): Json<CheckoutPayload>,
) -> AppResult<impl IntoResponse> {
    let input = CheckoutInput {
        plan_id: payload.plan_id,
        custom_amount: payload
            .custom_amount
            .map(|v| v.parse("customAmount"))
            .transpose()?,
        interview_count: payload
            .interview_count
            .map(|v| v.parse("interviewCount"))
            .transpose()?,
    };
    let result = app_state
        .billing_use_cases
        .create_checkout(account_id, input)
        .await?;
    Ok(Json(result))
}

/// GET /api/billing/verify?session_id=...
///
/// Races the webhook for the same session; whichever lands second gets the
/// stored result back.
async fn verify_session(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    Query(query): Query<VerifyQuery>,
) -> AppResult<impl IntoResponse> {
    let outcome = app_state
        .billing_use_cases
        .verify_session(account_id, &query.session_id)
        .await?;
    Ok(Json(FulfillmentResponse::from(outcome)))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(create_checkout))
        .route("/verify", get(verify_session))
}
