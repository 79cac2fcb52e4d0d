use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthAccount;
use crate::api::dtos::requests::CreateBlackoutRequest;
use crate::domain::services::catalog_service::NewBlackout;
use crate::error::AppError;
use std::sync::Arc;

pub async fn create_blackout(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(court_id): Path<String>,
    Json(payload): Json<CreateBlackoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    let blackout = state.catalog_service.add_blackout(&court_id, &identity.account_id, NewBlackout {
        start_date: payload.start_date,
        end_date: payload.end_date,
        start_time: payload.start_time,
        end_time: payload.end_time,
        reason: payload.reason,
    }).await?;
    Ok((StatusCode::CREATED, Json(blackout)))
}

pub async fn list_blackouts(
    State(state): State<Arc<AppState>>,
    _account: AuthAccount,
    Path(court_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog_service.list_blackouts(&court_id).await?))
}

pub async fn delete_blackout(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(blackout_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    state.catalog_service.remove_blackout(&blackout_id).await?;
    Ok(Json(serde_json::json!({"status": "deleted"})))
}
