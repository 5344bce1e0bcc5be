use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::{adapters::http::app_state::AppState, app_error::AppError, application::jwt};

/// The account behind a valid `Authorization: Bearer` token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedAccount(pub Uuid);

impl FromRequestParts<AppState> for AuthenticatedAccount {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::InvalidCredentials)?;

        let account_id = jwt::account_id(bearer.token(), &state.config.jwt_secret)?;
        Ok(AuthenticatedAccount(account_id))
    }
}
