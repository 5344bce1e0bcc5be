//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` wires the real use cases to in-memory ports so route
//! tests exercise the same fulfillment path production does.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        ports::payment_provider::CheckoutSession,
        use_cases::{
            billing::{BillingUseCases, CheckoutUrls},
            fulfillment::FulfillmentUseCases,
        },
    },
    domain::{
        entities::{entitlement::AccountEntitlement, plan::Plan},
        plan_catalog::PlanCatalog,
    },
    infra::config::AppConfig,
    test_utils::{FakePaymentProvider, InMemoryEntitlementRepo, test_plans},
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Config with test secrets; nothing is read from the environment.
pub fn test_config(overrides: impl FnOnce(&mut AppConfig)) -> AppConfig {
    let mut config = AppConfig {
        jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        app_origin: "http://localhost:3000".parse().unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: "postgres://unused".to_string(),
        stripe_secret_key: SecretString::new("sk_test_unused".into()),
        stripe_webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
        currency: "inr".to_string(),
        mock_payments_enabled: false,
        store_timeout: Duration::from_secs(5),
        provider_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(15),
    };
    overrides(&mut config);
    config
}

/// `Authorization` header value for `account_id`.
pub fn bearer_for(account_id: Uuid) -> String {
    let token = jwt::issue(
        account_id,
        &SecretString::new(TEST_JWT_SECRET.into()),
        time::Duration::minutes(10),
    )
    .unwrap();
    format!("Bearer {}", token)
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let repo = Arc::new(InMemoryEntitlementRepo::new());
/// let app_state = TestAppStateBuilder::new()
///     .with_entitlement_repo(repo.clone())
///     .with_session(create_test_session("sess_1", account, "starter", |_| {}))
///     .build();
/// ```
pub struct TestAppStateBuilder {
    plans: Vec<Plan>,
    entitlements: Vec<AccountEntitlement>,
    sessions: Vec<CheckoutSession>,
    mock_payments_enabled: bool,
    entitlement_repo: Option<Arc<InMemoryEntitlementRepo>>,
    provider: Option<Arc<FakePaymentProvider>>,
    timeouts: Option<(Duration, Duration)>,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            plans: test_plans(),
            entitlements: Vec::new(),
            sessions: Vec::new(),
            mock_payments_enabled: false,
            entitlement_repo: None,
            provider: None,
            timeouts: None,
        }
    }

    pub fn with_entitlement(mut self, entitlement: AccountEntitlement) -> Self {
        self.entitlements.push(entitlement);
        self
    }

    pub fn with_session(mut self, session: CheckoutSession) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn with_mock_payments(mut self, enabled: bool) -> Self {
        self.mock_payments_enabled = enabled;
        self
    }

    /// Share a repo with the test so it can inspect what was written.
    pub fn with_entitlement_repo(mut self, repo: Arc<InMemoryEntitlementRepo>) -> Self {
        self.entitlement_repo = Some(repo);
        self
    }

    /// Share a provider with the test so it can inspect created checkouts.
    /// Sessions added with `with_session` are ignored when this is set.
    pub fn with_provider(mut self, provider: Arc<FakePaymentProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Override the store and provider timeouts.
    pub fn with_timeouts(mut self, store: Duration, provider: Duration) -> Self {
        self.timeouts = Some((store, provider));
        self
    }

    pub fn build(self) -> AppState {
        let mock_payments_enabled = self.mock_payments_enabled;
        let timeouts = self.timeouts;
        let config = test_config(|c| {
            c.mock_payments_enabled = mock_payments_enabled;
            if let Some((store, provider)) = timeouts {
                c.store_timeout = store;
                c.provider_timeout = provider;
            }
        });

        let repo = self
            .entitlement_repo
            .unwrap_or_else(|| Arc::new(InMemoryEntitlementRepo::new()));
        for entitlement in self.entitlements {
            repo.insert_entitlement(entitlement);
        }

        let provider = self.provider.unwrap_or_else(|| {
            let provider = self
                .sessions
                .into_iter()
                .fold(FakePaymentProvider::new(), FakePaymentProvider::with_session);
            Arc::new(provider)
        });

        let fulfillment = Arc::new(FulfillmentUseCases::new(
            repo,
            Arc::new(PlanCatalog::new(self.plans)),
            config.store_timeout,
        ));

        let billing = BillingUseCases::new(
            fulfillment,
            provider,
            config.provider_timeout,
            CheckoutUrls {
                success_url: config.checkout_success_url(),
                cancel_url: config.checkout_cancel_url(),
            },
            config.currency.clone(),
            config.mock_payments_enabled,
        );

        AppState {
            config: Arc::new(config),
            billing_use_cases: Arc::new(billing),
        }
    }
}
