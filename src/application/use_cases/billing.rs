use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc, time::Duration};
use strum::{AsRefStr, Display, EnumString};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        fulfillment_normalizer::{
            FlexibleInt, FulfillmentDraft, MockFulfillment, from_mock_request,
            from_session_metadata, normalize,
        },
        ports::payment_provider::{
            CheckoutMetadata, CheckoutRequest, CheckoutResult, CheckoutSession, PaymentProviderPort,
        },
        use_cases::fulfillment::{FulfillmentOutcome, FulfillmentUseCases},
    },
    domain::{
        entities::{
            entitlement::AccountEntitlement,
            fulfillment::FulfillmentOrigin,
            plan::{CUSTOM_PLAN_ID, Plan},
        },
        renewal_pricing::{RenewalQuote, quote_renewal},
    },
};

/// Where checkout redirects the paying client.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentMethod {
    /// Hosted checkout; credits land via webhook or verify
    Stripe,
    /// Immediate fulfillment without a provider, test deployments only
    Mock,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutInput {
    pub plan_id: Option<String>,
    pub custom_amount: Option<i64>,
    pub interview_count: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RenewInput {
    pub payment_method: PaymentMethod,
    pub use_discount: bool,
    pub new_plan_id: Option<String>,
    /// Client-supplied retry key for the mock path
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewResult {
    pub quote: RenewalQuote,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout: Option<CheckoutResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfillment: Option<FulfillmentOutcome>,
}

/// Purchase flows around the fulfillment engine: checkout, verify, webhook,
/// mock, renewal and free-plan selection.
#[derive(Clone)]
pub struct BillingUseCases {
    fulfillment: Arc<FulfillmentUseCases>,
    provider: Arc<dyn PaymentProviderPort>,
    provider_timeout: Duration,
    checkout_urls: CheckoutUrls,
    currency: String,
    mock_payments_enabled: bool,
}

impl BillingUseCases {
    pub fn new(
        fulfillment: Arc<FulfillmentUseCases>,
        provider: Arc<dyn PaymentProviderPort>,
        provider_timeout: Duration,
        checkout_urls: CheckoutUrls,
        currency: String,
        mock_payments_enabled: bool,
    ) -> Self {
        Self {
            fulfillment,
            provider,
            provider_timeout,
            checkout_urls,
            currency,
            mock_payments_enabled,
        }
    }

    pub fn mock_payments_enabled(&self) -> bool {
        self.mock_payments_enabled
    }

    pub fn list_plans(&self) -> Vec<Plan> {
        self.fulfillment.catalog().active().into_iter().cloned().collect()
    }

    pub async fn get_entitlement(&self, account_id: Uuid) -> AppResult<AccountEntitlement> {
        self.fulfillment.get_entitlement(account_id).await
    }

    fn purchasable_plan(&self, plan_id: &str) -> AppResult<&Plan> {
        let plan = self
            .fulfillment
            .catalog()
            .lookup(plan_id)
            .ok_or(AppError::NotFound)?;
        if !plan.is_active {
            return Err(AppError::InvalidInput(format!(
                "Plan {} is no longer available",
                plan_id
            )));
        }
        Ok(plan)
    }

    // ========================================================================
    // Checkout
    // ========================================================================

    /// Start a hosted checkout for a catalog plan or a custom credit purchase.
    #[instrument(skip(self, input), fields(plan_id = ?input.plan_id))]
    pub async fn create_checkout(
        &self,
        account_id: Uuid,
        input: CheckoutInput,
    ) -> AppResult<CheckoutResult> {
        let (product_name, amount, metadata) = match input.plan_id.as_deref() {
            Some(plan_id) if plan_id != CUSTOM_PLAN_ID => {
                let plan = self.purchasable_plan(plan_id)?;
                if plan.classification.is_free() {
                    return Err(AppError::InvalidInput(
                        "Free plans are selected, not purchased".into(),
                    ));
                }
                let metadata = CheckoutMetadata {
                    account_id,
                    plan_id: Some(plan.id.clone()),
                    is_renewal: false,
                    interview_count: None,
                    new_plan_id: None,
                    custom_amount: None,
                };
                (plan.display_name.clone(), plan.unit_price, metadata)
            }
            _ => {
                let amount = input.custom_amount.ok_or_else(|| {
                    AppError::InvalidInput("customAmount is required without a plan".into())
                })?;
                let count = input.interview_count.ok_or_else(|| {
                    AppError::InvalidInput("interviewCount is required without a plan".into())
                })?;
                if amount <= 0 || count <= 0 {
                    return Err(AppError::InvalidInput(
                        "customAmount and interviewCount must be positive".into(),
                    ));
                }
                let metadata = CheckoutMetadata {
                    account_id,
                    plan_id: Some(CUSTOM_PLAN_ID.to_string()),
                    is_renewal: false,
                    interview_count: Some(count),
                    new_plan_id: None,
                    custom_amount: Some(amount),
                };
                (format!("{} interview credits", count), amount, metadata)
            }
        };

        self.start_checkout(product_name, amount, metadata).await
    }

    async fn start_checkout(
        &self,
        product_name: String,
        amount: i64,
        metadata: CheckoutMetadata,
    ) -> AppResult<CheckoutResult> {
        if amount <= 0 {
            return Err(AppError::InvalidInput("Checkout amount must be positive".into()));
        }
        let request = CheckoutRequest {
            product_name,
            amount,
            currency: self.currency.clone(),
            success_url: self.checkout_urls.success_url.clone(),
            cancel_url: self.checkout_urls.cancel_url.clone(),
            metadata,
        };
        let result = tokio::time::timeout(
            self.provider_timeout,
            self.provider.create_checkout_session(&request),
        )
        .await
        .map_err(|_| AppError::Timeout("payment provider".into()))??;

        tracing::info!(session_id = %result.session_id, amount, "Checkout session created");
        Ok(result)
    }

    // ========================================================================
    // Fulfillment triggers
    // ========================================================================

    /// Client-initiated confirmation after the checkout redirect.
    #[instrument(skip(self))]
    pub async fn verify_session(
        &self,
        account_id: Uuid,
        session_id: &str,
    ) -> AppResult<FulfillmentOutcome> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(AppError::InvalidInput("session_id is required".into()));
        }

        let session: CheckoutSession = tokio::time::timeout(
            self.provider_timeout,
            self.provider.retrieve_checkout_session(session_id),
        )
        .await
        .map_err(|_| AppError::Timeout("payment provider".into()))??;

        if !session.is_paid() {
            tracing::info!(payment_status = %session.payment_status, "Session not paid yet");
            return Err(AppError::PaymentIncomplete);
        }

        let event = from_session_metadata(&session.id, &session.metadata, FulfillmentOrigin::Verify)?;
        if event.account_id != account_id {
            tracing::warn!(session_account = %event.account_id, "Session belongs to another account");
            return Err(AppError::Forbidden);
        }

        self.fulfillment.apply(&event).await
    }

    /// Provider-pushed completion; the signature has already been checked.
    pub async fn fulfill_webhook_session(
        &self,
        session_id: &str,
        metadata: &HashMap<String, String>,
    ) -> AppResult<FulfillmentOutcome> {
        let event = from_session_metadata(session_id, metadata, FulfillmentOrigin::Webhook)?;
        self.fulfillment.apply(&event).await
    }

    /// Provider-less fulfillment for test deployments. Goes through the same
    /// normalizer and engine as real payments.
    #[instrument(skip(self, request))]
    pub async fn fulfill_mock(
        &self,
        account_id: Uuid,
        idempotency_key: Option<&str>,
        request: MockFulfillment,
    ) -> AppResult<FulfillmentOutcome> {
        if !self.mock_payments_enabled {
            return Err(AppError::NotFound);
        }
        let event = from_mock_request(mock_source_id(account_id, idempotency_key), account_id, request)?;
        self.fulfillment.apply(&event).await
    }

    // ========================================================================
    // Renewal
    // ========================================================================

    /// Price a renewal from authoritative state.
    pub async fn quote_renewal(
        &self,
        account_id: Uuid,
        new_plan_id: Option<&str>,
        use_discount: bool,
    ) -> AppResult<(AccountEntitlement, RenewalQuote)> {
        let current = self.fulfillment.get_entitlement(account_id).await?;
        let target_id = new_plan_id
            .or(current.plan_id.as_deref())
            .ok_or_else(|| AppError::InvalidInput("No plan to renew".into()))?;
        let target = match new_plan_id {
            Some(id) => self.purchasable_plan(id)?,
            None => self
                .fulfillment
                .catalog()
                .lookup(target_id)
                .ok_or(AppError::NotFound)?,
        };
        let quote = quote_renewal(&current, target, use_discount);
        Ok((current, quote))
    }

    #[instrument(skip(self, input), fields(method = %input.payment_method, new_plan_id = ?input.new_plan_id))]
    pub async fn renew(&self, account_id: Uuid, input: RenewInput) -> AppResult<RenewResult> {
        let (current, quote) = self
            .quote_renewal(account_id, input.new_plan_id.as_deref(), input.use_discount)
            .await?;

        let plan_id = current.plan_id.clone().unwrap_or_else(|| quote.plan_id.clone());
        let new_plan_id = quote.is_switch.then(|| quote.plan_id.clone());

        tracing::info!(
            base_price = quote.base_price,
            final_price = quote.final_price,
            discount_applied = quote.discount_applied,
            credits = quote.credits,
            "Renewal priced"
        );

        match input.payment_method {
            PaymentMethod::Mock => {
                let request = MockFulfillment {
                    plan_id: Some(plan_id),
                    is_renewal: true,
                    custom_amount: (quote.final_price > 0)
                        .then_some(FlexibleInt::Number(quote.final_price)),
                    interview_count: Some(FlexibleInt::Number(quote.credits)),
                    new_plan_id,
                };
                let outcome = self
                    .fulfill_mock(account_id, input.idempotency_key.as_deref(), request)
                    .await?;
                Ok(RenewResult {
                    quote,
                    checkout: None,
                    fulfillment: Some(outcome),
                })
            }
            PaymentMethod::Stripe => {
                let metadata = CheckoutMetadata {
                    account_id,
                    plan_id: Some(plan_id),
                    is_renewal: true,
                    interview_count: Some(quote.credits),
                    new_plan_id,
                    custom_amount: Some(quote.final_price),
                };
                let product_name = format!("Renewal: {}", quote.plan_id);
                let checkout = self
                    .start_checkout(product_name, quote.final_price, metadata)
                    .await?;
                Ok(RenewResult {
                    quote,
                    checkout: Some(checkout),
                    fulfillment: None,
                })
            }
        }
    }

    // ========================================================================
    // Free plan selection
    // ========================================================================

    /// Put an account without a plan onto a free plan.
    #[instrument(skip(self))]
    pub async fn select_free_plan(
        &self,
        account_id: Uuid,
        plan_id: &str,
    ) -> AppResult<FulfillmentOutcome> {
        let plan = self.purchasable_plan(plan_id)?;
        if !plan.classification.is_free() {
            return Err(AppError::InvalidInput(
                "Only free plans can be selected without payment".into(),
            ));
        }

        let mut draft = FulfillmentDraft::new(FulfillmentOrigin::Selection);
        draft.source_id = Some(format!("select_{}_{}", account_id, plan.id));
        draft.account_id = Some(account_id);
        draft.plan_id = Some(plan.id.clone());
        let event = normalize(draft)?;

        // A repeat answers with the stored result; an account that has a plan
        // by the time of the write is rejected by the engine.
        self.fulfillment.apply(&event).await
    }
}

/// Client keys are scoped to the account so two accounts never share one.
fn mock_source_id(account_id: Uuid, idempotency_key: Option<&str>) -> String {
    match idempotency_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => format!("mock_{}_{}", account_id, key),
        None => format!("mock_{}", Uuid::new_v4()),
    }
}
