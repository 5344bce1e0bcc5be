use async_trait::async_trait;
use secrecy::SecretString;

use crate::{
    app_error::AppResult,
    application::ports::payment_provider::{
        CheckoutRequest, CheckoutResult, CheckoutSession, PaymentProviderPort,
    },
    infra::stripe_client::{StripeCheckoutSession, StripeClient},
};

/// Adapter that wraps StripeClient to implement PaymentProviderPort.
#[derive(Clone)]
pub struct StripePaymentAdapter {
    client: StripeClient,
}

impl StripePaymentAdapter {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            client: StripeClient::new(secret_key),
        }
    }

    fn to_session(session: StripeCheckoutSession) -> CheckoutSession {
        CheckoutSession {
            id: session.id,
            payment_status: session.payment_status.unwrap_or_default(),
            amount_total: session.amount_total,
            metadata: session.metadata.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl PaymentProviderPort for StripePaymentAdapter {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult> {
        let session = self.client.create_checkout_session(request).await?;
        Ok(CheckoutResult {
            session_id: session.id,
            url: session.url,
        })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<CheckoutSession> {
        let session = self.client.get_checkout_session(session_id).await?;
        Ok(Self::to_session(session))
    }
}
