pub mod billing;
pub mod fulfillment;
pub mod plan_catalog;
