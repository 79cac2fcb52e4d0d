use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthAccount;
use crate::api::dtos::requests::{CreateCourtRequest, UpdateCourtRequest, CreateSlotRequest, UpdateSlotRequest};
use crate::api::dtos::responses::CourtDetailResponse;
use crate::domain::models::schedule::NewSlotParams;
use crate::domain::services::catalog_service::{CourtChanges, NewCourt, SlotChanges};
use crate::error::AppError;
use std::sync::Arc;

pub async fn create_court(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Json(payload): Json<CreateCourtRequest>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    let court = state.catalog_service.create_court(NewCourt {
        name: payload.name,
        modality: payload.modality,
        max_occupancy: payload.max_occupancy,
        description: payload.description,
    }).await?;
    Ok((StatusCode::CREATED, Json(court)))
}

pub async fn list_courts(
    State(state): State<Arc<AppState>>,
    _account: AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog_service.list_courts().await?))
}

pub async fn get_court(
    State(state): State<Arc<AppState>>,
    _account: AuthAccount,
    Path(court_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let court = state.catalog_service.get_court(&court_id).await?;
    let slots = state.catalog_service.list_slots(&court_id).await?;
    Ok(Json(CourtDetailResponse { court, slots }))
}

pub async fn update_court(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(court_id): Path<String>,
    Json(payload): Json<UpdateCourtRequest>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    let court = state.catalog_service.update_court(&court_id, CourtChanges {
        name: payload.name,
        modality: payload.modality,
        max_occupancy: payload.max_occupancy,
        status: payload.status,
        description: payload.description,
    }).await?;
    Ok(Json(court))
}

pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(court_id): Path<String>,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    let slot = state.catalog_service.add_slot(&court_id, NewSlotParams {
        court_id: court_id.clone(),
        weekday: payload.weekday,
        start_time: payload.start_time,
        end_time: payload.end_time,
        casual_price_cents: payload.casual_price_cents,
        subscriber_price_cents: payload.subscriber_price_cents,
    }).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    _account: AuthAccount,
    Path(court_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog_service.list_slots(&court_id).await?))
}

pub async fn update_slot(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(slot_id): Path<String>,
    Json(payload): Json<UpdateSlotRequest>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    let slot = state.catalog_service.update_slot(&slot_id, SlotChanges {
        weekday: payload.weekday,
        start_time: payload.start_time,
        end_time: payload.end_time,
        casual_price_cents: payload.casual_price_cents,
        subscriber_price_cents: payload.subscriber_price_cents,
        active: payload.active,
    }).await?;
    Ok(Json(slot))
}
