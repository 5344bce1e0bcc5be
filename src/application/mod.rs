pub mod app_error;
pub mod fulfillment_normalizer;
pub mod jwt;
pub mod ports;
pub mod use_cases;
