use serde::Serialize;

use super::entities::{entitlement::AccountEntitlement, plan::Plan};

/// Discount offered to renewing accounts that still hold credits.
pub const RENEWAL_DISCOUNT_PERCENTAGE: i64 = 15;

/// Free-plan renewal is a fixed fee, never discounted.
pub const FREE_RENEWAL_PRICE: i64 = 30;
pub const FREE_RENEWAL_CREDITS: i64 = 1;

/// Server-side price computation for a renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalQuote {
    pub plan_id: String,
    pub is_switch: bool,
    pub base_price: i64,
    /// Discount the account qualifies for, whether or not it was requested
    pub discount_percentage: i64,
    pub discount_applied: bool,
    pub final_price: i64,
    pub credits: i64,
}

/// Price a renewal of `target` for an account in state `current`.
///
/// `use_discount` is only a request: the discount is granted when the account
/// holds a positive balance and is not moving onto a different bundle.
pub fn quote_renewal(current: &AccountEntitlement, target: &Plan, use_discount: bool) -> RenewalQuote {
    let is_switch = current.plan_id.as_deref() != Some(target.id.as_str());

    if target.classification.is_free() {
        return RenewalQuote {
            plan_id: target.id.clone(),
            is_switch,
            base_price: FREE_RENEWAL_PRICE,
            discount_percentage: 0,
            discount_applied: false,
            final_price: FREE_RENEWAL_PRICE,
            credits: FREE_RENEWAL_CREDITS,
        };
    }

    let switching_bundle = is_switch && target.is_bundle();
    let discount_percentage = if current.credit_balance > 0 && !switching_bundle {
        RENEWAL_DISCOUNT_PERCENTAGE
    } else {
        0
    };
    let discount_applied = use_discount && discount_percentage > 0;
    let final_price = if discount_applied {
        apply_discount(target.unit_price, discount_percentage)
    } else {
        target.unit_price
    };

    RenewalQuote {
        plan_id: target.id.clone(),
        is_switch,
        base_price: target.unit_price,
        discount_percentage,
        discount_applied,
        final_price,
        credits: target.credit_grant,
    }
}

/// Integer form of `round(base * (1 - pct / 100))`, rounding halves up.
fn apply_discount(base_price: i64, percentage: i64) -> i64 {
    (base_price * (100 - percentage) + 50) / 100
}
