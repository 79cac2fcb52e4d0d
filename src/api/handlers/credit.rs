use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthAccount;
use crate::api::dtos::requests::{AdjustCreditsRequest, HistoryQuery};
use crate::api::dtos::responses::BalanceResponse;
use crate::error::AppError;
use std::sync::Arc;

pub async fn my_balance(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    let balance_cents = state.ledger_service.balance(&identity.account_id).await?;
    Ok(Json(BalanceResponse { account_id: identity.account_id, balance_cents }))
}

pub async fn my_transactions(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.ledger_service.history(&identity.account_id, query.limit).await?))
}

pub async fn adjust_credits(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(account_id): Path<String>,
    Json(payload): Json<AdjustCreditsRequest>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    let tx = state.ledger_service.adjust(&identity.account_id, &account_id, payload.amount_cents, payload.description).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn expire_credits(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    match state.ledger_service.expire(&identity.account_id, &account_id).await? {
        Some(tx) => Ok((StatusCode::CREATED, Json(serde_json::json!(tx)))),
        None => Ok((StatusCode::OK, Json(serde_json::json!({"status": "nothing_to_expire"})))),
    }
}

pub async fn audit_ledger(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    Ok(Json(state.ledger_service.audit(&account_id).await?))
}
