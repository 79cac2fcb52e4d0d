use axum::{extract::{State, Path}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthAccount;
use crate::api::dtos::requests::SetAccountStatusRequest;
use crate::domain::models::account::Account;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

/// Creates or refreshes the local account row from the token claims.
pub async fn sync_account(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    let account = Account::new(
        identity.account_id.clone(),
        identity.name.clone().unwrap_or_else(|| identity.account_id.clone()),
        identity.email.clone().unwrap_or_default(),
        identity.role,
    );
    let synced = state.account_repo.upsert(&account).await?;
    info!(account_id = %synced.id, role = %synced.role, "Account synced");
    Ok(Json(synced))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    let account = state.account_repo.find_by_id(&identity.account_id).await?
        .ok_or(AppError::NotFound("Account not synced yet".into()))?;
    Ok(Json(account))
}

pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    Ok(Json(state.account_repo.list().await?))
}

pub async fn set_account_status(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(account_id): Path<String>,
    Json(payload): Json<SetAccountStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    let updated = state.account_repo.set_status(&account_id, payload.status).await?
        .ok_or(AppError::NotFound("Account not found".into()))?;
    info!(account_id = %account_id, status = %updated.status, changed_by = %identity.account_id, "Account status changed");
    Ok(Json(updated))
}
