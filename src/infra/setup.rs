use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::PostgresPersistence},
    infra::{config::AppConfig, error::InfraError, stripe_payment_adapter::StripePaymentAdapter},
    use_cases::{
        billing::{BillingUseCases, CheckoutUrls},
        fulfillment::{EntitlementRepo, FulfillmentUseCases},
        plan_catalog::load_plan_catalog,
    },
};

/// Wire the use cases over an already-connected store.
pub async fn init_app_state(
    config: AppConfig,
    persistence: PostgresPersistence,
) -> anyhow::Result<AppState> {
    let persistence = Arc::new(persistence);

    let catalog = load_plan_catalog(persistence.as_ref())
        .await
        .map_err(|e| InfraError::Catalog(e.to_string()))?;

    let fulfillment = FulfillmentUseCases::new(
        persistence.clone() as Arc<dyn EntitlementRepo>,
        Arc::new(catalog),
        config.store_timeout,
    );

    let provider = Arc::new(StripePaymentAdapter::new(config.stripe_secret_key.clone()));

    let checkout_urls = CheckoutUrls {
        success_url: config.checkout_success_url(),
        cancel_url: config.checkout_cancel_url(),
    };

    if config.mock_payments_enabled {
        tracing::warn!("Mock payments are enabled; credits can be granted without payment");
    }

    let billing_use_cases = BillingUseCases::new(
        Arc::new(fulfillment),
        provider,
        config.provider_timeout,
        checkout_urls,
        config.currency.clone(),
        config.mock_payments_enabled,
    );

    Ok(AppState {
        config: Arc::new(config),
        billing_use_cases: Arc::new(billing_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "entitlement_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
