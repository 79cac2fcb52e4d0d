use axum::{
    extract::{FromRequestParts, FromRef},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use crate::state::AppState;
use crate::domain::models::auth::{Claims, Identity};
use std::sync::Arc;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};
use tracing::{Span, debug};

/// Caller vouched for by the identity provider's bearer token.
pub struct AuthAccount(pub Identity);

impl<S> FromRequestParts<S> for AuthAccount
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        let decoding_key = DecodingKey::from_ed_pem(app_state.config.jwt_public_key.as_bytes())
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[app_state.config.auth_audience.as_str()]);
        validation.set_issuer(&[app_state.config.auth_issuer.as_str()]);

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| {
                debug!("Rejected bearer token: {}", e);
                StatusCode::UNAUTHORIZED
            })?;

        let claims = token_data.claims;
        Span::current().record("account_id", claims.sub.as_str());

        Ok(AuthAccount(Identity {
            account_id: claims.sub,
            role: claims.role,
            name: claims.name,
            email: claims.email,
        }))
    }
}

/// The payment processor calling back with settlement events. It presents the
/// shared service token instead of a user token.
pub struct ProcessorCallback;

impl<S> FromRequestParts<S> for ProcessorCallback
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;
        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        if token != app_state.config.payment_service_token {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(ProcessorCallback)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts.headers.get(AUTHORIZATION)?
        .to_str().ok()?
        .strip_prefix("Bearer ")
}
