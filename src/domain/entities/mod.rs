pub mod entitlement;
pub mod fulfillment;
pub mod plan;
