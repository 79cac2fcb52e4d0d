use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthAccount;
use crate::api::dtos::requests::{RedeemReferralRequest, SetCodeActiveRequest};
use crate::error::AppError;
use std::sync::Arc;

pub async fn issue_code(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.referral_service.issue_code(&identity.account_id).await?))
}

pub async fn set_code_active(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Json(payload): Json<SetCodeActiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.referral_service.set_code_active(&identity.account_id, payload.active).await?))
}

pub async fn redeem_code(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Json(payload): Json<RedeemReferralRequest>,
) -> Result<impl IntoResponse, AppError> {
    let referral = state.referral_service.redeem(&payload.code, &identity.account_id).await?;
    Ok((StatusCode::CREATED, Json(referral)))
}

pub async fn my_referrals(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.referral_service.summary(&identity.account_id).await?))
}

pub async fn referral_stats(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    Ok(Json(state.referral_service.stats().await?))
}
