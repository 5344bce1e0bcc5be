use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

pub struct AppConfig {
    /// HS256 secret shared with the identity provider that issues bearer tokens.
    pub jwt_secret: SecretString,
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub stripe_secret_key: SecretString,
    pub stripe_webhook_secret: SecretString,
    /// ISO currency code sent to checkout, lowercase.
    pub currency: String,
    /// Exposes the provider-less fulfillment path. Never enable in production.
    pub mock_payments_enabled: bool,
    /// Bound on one fulfillment, retries included.
    pub store_timeout: Duration,
    pub provider_timeout: Duration,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let database_url: String = get_env("DATABASE_URL");
        let stripe_secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let currency = get_env_default("CURRENCY", String::from("inr")).to_lowercase();
        // Off unless explicitly enabled
        let mock_payments_enabled: bool = get_env_default("MOCK_PAYMENTS_ENABLED", false);
        let store_timeout_ms: u64 = get_env_default("STORE_TIMEOUT_MS", 5_000);
        let provider_timeout_ms: u64 = get_env_default("PROVIDER_TIMEOUT_MS", 5_000);
        let request_timeout_secs: u64 = get_env_default("REQUEST_TIMEOUT_SECS", 15);

        Self {
            jwt_secret,
            app_origin,
            cors_origin,
            bind_addr,
            database_url,
            stripe_secret_key,
            stripe_webhook_secret,
            currency,
            mock_payments_enabled,
            store_timeout: Duration::from_millis(store_timeout_ms),
            provider_timeout: Duration::from_millis(provider_timeout_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }

    /// Where checkout sends the client back to, with the session id templated in.
    pub fn checkout_success_url(&self) -> String {
        let mut url = self.app_origin.clone();
        url.set_path("/billing/success");
        format!("{}?session_id={{CHECKOUT_SESSION_ID}}", url)
    }

    pub fn checkout_cancel_url(&self) -> String {
        let mut url = self.app_origin.clone();
        url.set_path("/billing/cancel");
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::test_config;

    #[test]
    fn checkout_urls_hang_off_app_origin() {
        let config = test_config(|c| c.app_origin = "https://app.example.com".parse().unwrap());

        assert_eq!(
            config.checkout_success_url(),
            "https://app.example.com/billing/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(config.checkout_cancel_url(), "https://app.example.com/billing/cancel");
    }
}
