//! Plan listing, entitlement lookup and free-plan selection.

use super::common::*;
use crate::domain::entities::plan::Plan;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    id: String,
    display_name: String,
    unit_price: i64,
    credit_grant: i64,
    classification: String,
    validity_months: i32,
    is_bundle: bool,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        Self {
            is_bundle: plan.is_bundle(),
            classification: plan.classification.to_string(),
            id: plan.id,
            display_name: plan.display_name,
            unit_price: plan.unit_price,
            credit_grant: plan.credit_grant,
            validity_months: plan.validity_months,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectPlanPayload {
    plan_id: String,
}

/// GET /api/billing/plans
async fn list_plans(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let plans: Vec<PlanResponse> = app_state
        .billing_use_cases
        .list_plans()
        .into_iter()
        .map(PlanResponse::from)
        .collect();
    Ok(Json(plans))
}

/// GET /api/billing/entitlement
async fn get_entitlement(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
) -> AppResult<impl IntoResponse> {
    let entitlement = app_state.billing_use_cases.get_entitlement(account_id).await?;
    Ok(Json(entitlement))
}

/// POST /api/billing/select-plan
async fn select_plan(
    State(app_state): State<AppState>,
    AuthenticatedAccount(account_id): AuthenticatedAccount,
    Json(payload): Json<SelectPlanPayload>,
) -> AppResult<impl IntoResponse> {
    let outcome = app_state
        .billing_use_cases
        .select_free_plan(account_id, payload.plan_id.trim())
        .await?;
    Ok(Json(FulfillmentResponse::from(outcome)))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/entitlement", get(get_entitlement))
        .route("/select-plan", post(select_plan))
}
