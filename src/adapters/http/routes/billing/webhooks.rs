//! Stripe webhook handler.

use super::common::*;
use crate::infra::stripe_client::{StripeClient, StripeWebhookEvent};
use secrecy::ExposeSecret;
use tracing::error;

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/billing/webhook
///
/// The signature is checked against the raw body before anything is parsed.
async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("Missing Stripe signature".into()))?;

    StripeClient::verify_webhook_signature(
        &body,
        signature,
        app_state.config.stripe_webhook_secret.expose_secret(),
    )?;

    let event: StripeWebhookEvent = serde_json::from_str(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            handle_checkout_session_completed(&app_state, &event).await?
        }
        "checkout.session.async_payment_failed" => {
            let session_id = event.data.object["id"].as_str().unwrap_or("unknown");
            tracing::warn!(event_id = %event.id, session_id, "Async payment failed");
        }
        "checkout.session.expired" => {
            let session_id = event.data.object["id"].as_str().unwrap_or("unknown");
            tracing::debug!(event_id = %event.id, session_id, "Checkout session expired");
        }
        other => {
            tracing::debug!(event_id = %event.id, event_type = other, "Unhandled webhook event type");
        }
    }

    Ok(StatusCode::OK)
}

// ============================================================================
// Event Handlers
// ============================================================================

async fn handle_checkout_session_completed(
    app_state: &AppState,
    event: &StripeWebhookEvent,
) -> AppResult<()> {
    let Some(session) = event.get_checkout_session() else {
        tracing::warn!(event_id = %event.id, retryable = false, "Checkout event without a session object");
        return Ok(());
    };

    let payment_status = session.payment_status.as_deref().unwrap_or("");
    if payment_status != "paid" {
        // Delayed methods complete later via async_payment_succeeded.
        tracing::info!(
            event_id = %event.id,
            session_id = %session.id,
            payment_status,
            "Checkout completed without payment, nothing to fulfill yet"
        );
        return Ok(());
    }

    let metadata = session.metadata.unwrap_or_default();
    match app_state
        .billing_use_cases
        .fulfill_webhook_session(&session.id, &metadata)
        .await
    {
        Ok(outcome) => {
            tracing::info!(
                event_id = %event.id,
                session_id = %session.id,
                already_applied = outcome.is_replay(),
                credit_balance = outcome.entitlement().credit_balance,
                "Webhook fulfillment settled"
            );
            Ok(())
        }
        Err(e) if e.is_retryable() => {
            error!(
                error = %e,
                event_type = %event.event_type,
                event_id = %event.id,
                retryable = true,
                "Webhook processing failed, returning error for Stripe retry"
            );
            Err(e)
        }
        Err(e) => {
            error!(
                error = %e,
                event_id = %event.id,
                session_id = %session.id,
                retryable = false,
                "Webhook fulfillment rejected; acknowledging so Stripe stops retrying"
            );
            Ok(())
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}

// ============================================================================
// Tests
// ============================================================================
