//! Renewal pricing and renewal purchase.
//!
//! Prices are always computed server-side; `useDiscount` is a request the
//! server may decline.

use super::common::*;
use crate::application::use_cases::billing::{PaymentMethod, RenewInput};

const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteQuery {
    new_plan_id: Option<String>,
    #[serde(default)]
    use_discount: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenewPayload {
    payment_method: PaymentMethod,
    #[serde(default)]
    use_discount: bool,
    new_plan_id: Option<String>,
}

/// GET /api/billing/renewal-quote
async fn renewal_quote(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    Query(query): Query<QuoteQuery>,
) -> AppResult<impl IntoResponse> {
    let (_, quote) = app_state
        .billing_use_cases
        .quote_renewal(account_id, query.new_plan_id.as_deref(), query.use_discount)
        .await?;
    Ok(Json(quote))
}

/// POST /api/billing/renew
async fn renew(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    headers: HeaderMap,
    Json(payload): Json<RenewPayload>,
) -> AppResult<impl IntoResponse> {
    let input = RenewInput {
        payment_method: payload.payment_method,
        use_discount: payload.use_discount,
        new_plan_id: payload.new_plan_id.filter(|id| !id.trim().is_empty()),
        idempotency_key: headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    let result = app_state.billing_use_cases.renew(account_id, input).await?;
    Ok(Json(result))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/renewal-quote", get(renewal_quote))
        .route("/renew", post(renew))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use std::sync::Arc;

    use crate::domain::entities::entitlement::{BillingCycle, SubscriptionStatus};
    use crate::test_utils::{
        FakePaymentProvider, InMemoryEntitlementRepo, TestAppStateBuilder, bearer_for,
        create_test_entitlement,
    };

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    fn starter_account(account: Uuid, balance: i64) -> AccountEntitlement {
        create_test_entitlement(account, |e| {
            e.plan_id = Some("starter".into());
            e.billing_cycle = Some(BillingCycle::Monthly);
            e.subscription_status = SubscriptionStatus::Active;
            e.credit_balance = balance;
        })
    }

    #[tokio::test]
    async fn mock_renewal_adds_to_balance() {
        let account = Uuid::new_v4();
        let repo = Arc::new(InMemoryEntitlementRepo::new());
        let app_state = TestAppStateBuilder::new()
            .with_mock_payments(true)
            .with_entitlement_repo(repo.clone())
            .with_entitlement(starter_account(account, 2))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/renew")
            .add_header("authorization", bearer_for(account))
            .json(&json!({ "paymentMethod": "mock", "useDiscount": false }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["quote"]["finalPrice"], 499);
        assert_eq!(body["fulfillment"]["status"], "applied");

        let stored = repo.entitlement(account).unwrap();
        assert_eq!(stored.credit_balance, 7);
        assert_eq!(stored.plan_id.as_deref(), Some("starter"));
        assert_eq!(stored.subscription_status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn discount_is_granted_server_side_only() {
        let with_credits = Uuid::new_v4();
        let empty = Uuid::new_v4();
        let app_state = TestAppStateBuilder::new()
            .with_entitlement(starter_account(with_credits, 2))
            .with_entitlement(starter_account(empty, 0))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let granted: Value = server
            .get("/renewal-quote")
            .add_query_param("useDiscount", "true")
            .add_header("authorization", bearer_for(with_credits))
            .await
            .json();
        assert_eq!(granted["discountApplied"], true);
        assert_eq!(granted["finalPrice"], 424);

        let declined: Value = server
            .get("/renewal-quote")
            .add_query_param("useDiscount", "true")
            .add_header("authorization", bearer_for(empty))
            .await
            .json();
        assert_eq!(declined["discountApplied"], false);
        assert_eq!(declined["finalPrice"], 499);
    }

    #[tokio::test]
    async fn stripe_renewal_creates_checkout_with_server_price() {
        let account = Uuid::new_v4();
        let provider = Arc::new(FakePaymentProvider::new());
        let repo = Arc::new(InMemoryEntitlementRepo::new());
        let app_state = TestAppStateBuilder::new()
            .with_provider(provider.clone())
            .with_entitlement_repo(repo.clone())
            .with_entitlement(starter_account(account, 2))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/renew")
            .add_header("authorization", bearer_for(account))
            .json(&json!({ "paymentMethod": "stripe", "useDiscount": true, "newPlanId": "pro" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["checkout"]["sessionId"], "cs_test_1");
        assert_eq!(body["quote"]["finalPrice"], 849);

        let checkouts = provider.checkouts();
        assert_eq!(checkouts[0].amount, 849);
        let metadata = checkouts[0].metadata.to_map();
        assert_eq!(metadata.get("isRenewal").map(String::as_str), Some("true"));
        assert_eq!(metadata.get("planId").map(String::as_str), Some("starter"));
        assert_eq!(metadata.get("newPlanId").map(String::as_str), Some("pro"));
        assert_eq!(metadata.get("interviewCount").map(String::as_str), Some("12"));

        // Nothing is granted until the payment completes.
        assert_eq!(repo.entitlement(account).unwrap().credit_balance, 2);
    }

    #[tokio::test]
    async fn mock_renewal_with_switch_moves_plan_additively() {
        let account = Uuid::new_v4();
        let repo = Arc::new(InMemoryEntitlementRepo::new());
        let app_state = TestAppStateBuilder::new()
            .with_mock_payments(true)
            .with_entitlement_repo(repo.clone())
            .with_entitlement(starter_account(account, 2))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        server
            .post("/renew")
            .add_header("authorization", bearer_for(account))
            .json(&json!({ "paymentMethod": "mock", "newPlanId": "bundle5" }))
            .await
            .assert_status_ok();

        let stored = repo.entitlement(account).unwrap();
        assert_eq!(stored.credit_balance, 7);
        assert_eq!(stored.plan_id.as_deref(), Some("bundle5"));
        assert_eq!(stored.billing_cycle, Some(BillingCycle::OneTime));
    }

    #[tokio::test]
    async fn account_without_plan_must_name_one() {
        let account = Uuid::new_v4();
        let app_state = TestAppStateBuilder::new().with_mock_payments(true).build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        server
            .post("/renew")
            .add_header("authorization", bearer_for(account))
            .json(&json!({ "paymentMethod": "mock" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_payment_method_is_rejected() {
        let account = Uuid::new_v4();
        let app_state = TestAppStateBuilder::new()
            .with_entitlement(starter_account(account, 1))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/renew")
            .add_header("authorization", bearer_for(account))
            .json(&json!({ "paymentMethod": "cheque" }))
            .await;

        assert!(response.status_code().is_client_error());
    }
}
