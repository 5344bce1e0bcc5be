pub mod entities;
pub mod plan_catalog;
pub mod reconciliation;
pub mod renewal_pricing;
