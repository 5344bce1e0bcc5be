//! Builds a [`FulfillmentEvent`] from adapter-specific payloads.
//!
//! Fails closed: anything missing or ambiguous is a validation error rather
//! than a silent default.

use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::metadata_keys,
    domain::entities::{
        fulfillment::{CreditGrant, FulfillmentEvent, FulfillmentOrigin},
        plan::CUSTOM_PLAN_ID,
    },
};

/// Integer that clients send either as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FlexibleInt {
    Number(i64),
    Text(String),
}

impl FlexibleInt {
    pub fn parse(&self, field: &str) -> AppResult<i64> {
        match self {
            FlexibleInt::Number(n) => Ok(*n),
            FlexibleInt::Text(s) => parse_int(s, field),
        }
    }
}

/// Unvalidated fulfillment fields, as gathered by an adapter.
#[derive(Debug, Clone)]
pub struct FulfillmentDraft {
    pub source_id: Option<String>,
    pub account_id: Option<Uuid>,
    pub plan_id: Option<String>,
    pub interview_count: Option<i64>,
    pub is_renewal: bool,
    pub new_plan_id: Option<String>,
    pub custom_amount: Option<i64>,
    pub origin: FulfillmentOrigin,
}

impl FulfillmentDraft {
    pub fn new(origin: FulfillmentOrigin) -> Self {
        Self {
            source_id: None,
            account_id: None,
            plan_id: None,
            interview_count: None,
            is_renewal: false,
            new_plan_id: None,
            custom_amount: None,
            origin,
        }
    }
}

/// Validate a draft into a canonical event.
pub fn normalize(draft: FulfillmentDraft) -> AppResult<FulfillmentEvent> {
    let source_id = non_empty(draft.source_id)
        .ok_or_else(|| AppError::InvalidInput("Missing payment source id".into()))?;
    let account_id = draft
        .account_id
        .ok_or_else(|| AppError::InvalidInput("Missing account id".into()))?;

    if let Some(count) = draft.interview_count
        && count < 0
    {
        return Err(AppError::InvalidInput(format!(
            "Interview count must not be negative (got {})",
            count
        )));
    }

    if let Some(amount) = draft.custom_amount
        && amount <= 0
    {
        return Err(AppError::InvalidInput(format!(
            "Custom amount must be positive (got {})",
            amount
        )));
    }

    let plan_id = non_empty(draft.plan_id);
    let has_catalog_plan = plan_id.as_deref().is_some_and(|id| id != CUSTOM_PLAN_ID);

    if !has_catalog_plan {
        if draft.interview_count.is_none() {
            return Err(AppError::InvalidInput(
                "Either a plan or an explicit interview count is required".into(),
            ));
        }
        if draft.custom_amount.is_none() && !draft.is_renewal {
            return Err(AppError::InvalidInput(
                "Custom purchases must declare their amount".into(),
            ));
        }
    }

    let granted_credits = match draft.interview_count {
        Some(count) => CreditGrant::Explicit(count),
        None => CreditGrant::PlanDefault,
    };

    Ok(FulfillmentEvent {
        source_id,
        account_id,
        plan_id,
        granted_credits,
        is_renewal: draft.is_renewal,
        new_plan_id: non_empty(draft.new_plan_id),
        custom_amount: draft.custom_amount,
        origin: draft.origin,
    })
}

/// Build an event from a provider checkout session's metadata.
///
/// Used by both the webhook and the verify adapters so that either one
/// produces an identical event for the same session.
pub fn from_session_metadata(
    session_id: &str,
    metadata: &HashMap<String, String>,
    origin: FulfillmentOrigin,
) -> AppResult<FulfillmentEvent> {
    let get = |key: &str| metadata.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    let account_id = get(metadata_keys::USER_ID)
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| AppError::InvalidInput(format!("Invalid userId in metadata: {}", raw)))
        })
        .transpose()?;

    let is_renewal = match get(metadata_keys::IS_RENEWAL) {
        None => false,
        Some(raw) => parse_bool(raw, metadata_keys::IS_RENEWAL)?,
    };

    let mut draft = FulfillmentDraft::new(origin);
    draft.source_id = Some(session_id.to_string());
    draft.account_id = account_id;
    draft.plan_id = get(metadata_keys::PLAN_ID).map(str::to_string);
    draft.is_renewal = is_renewal;
    draft.new_plan_id = get(metadata_keys::NEW_PLAN_ID).map(str::to_string);
    draft.interview_count = get(metadata_keys::INTERVIEW_COUNT)
        .map(|raw| parse_int(raw, metadata_keys::INTERVIEW_COUNT))
        .transpose()?;
    draft.custom_amount = get(metadata_keys::CUSTOM_AMOUNT)
        .map(|raw| parse_int(raw, metadata_keys::CUSTOM_AMOUNT))
        .transpose()?;

    normalize(draft)
}

/// Fields of a mock fulfillment request.
#[derive(Debug, Clone, Default)]
pub struct MockFulfillment {
    pub plan_id: Option<String>,
    pub is_renewal: bool,
    pub custom_amount: Option<FlexibleInt>,
    pub interview_count: Option<FlexibleInt>,
    pub new_plan_id: Option<String>,
}

pub fn from_mock_request(
    source_id: String,
    account_id: Uuid,
    request: MockFulfillment,
) -> AppResult<FulfillmentEvent> {
    let mut draft = FulfillmentDraft::new(FulfillmentOrigin::Mock);
    draft.source_id = Some(source_id);
    draft.account_id = Some(account_id);
    draft.plan_id = request.plan_id;
    draft.is_renewal = request.is_renewal;
    draft.new_plan_id = request.new_plan_id;
    draft.interview_count = request
        .interview_count
        .map(|v| v.parse(metadata_keys::INTERVIEW_COUNT))
        .transpose()?;
    draft.custom_amount = request
        .custom_amount
        .map(|v| v.parse(metadata_keys::CUSTOM_AMOUNT))
        .transpose()?;

    normalize(draft)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_int(raw: &str, field: &str) -> AppResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::InvalidInput(format!("{} must be an integer, got {:?}", field, raw)))
}

fn parse_bool(raw: &str, field: &str) -> AppResult<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::InvalidInput(format!(
            "{} must be true or false, got {:?}",
            field, raw
        ))),
    }
}
