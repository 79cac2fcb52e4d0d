use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthAccount;
use crate::api::dtos::requests::{CreateReservationRequest, CancelQuery, RangeQuery};
use crate::api::dtos::responses::CancellationResponse;
use crate::domain::services::reservation_service::CreateReservation;
use crate::error::AppError;
use std::sync::Arc;

pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = state.reservation_service.create(&identity, CreateReservation {
        court_id: payload.court_id,
        date: payload.date,
        start_time: payload.start_time,
        end_time: payload.end_time,
        participants: payload.participants,
        kind: payload.kind,
        credit_offset_cents: payload.credit_offset_cents,
        organizer_id: payload.organizer_id,
        confirm: payload.confirm,
    }).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn list_my_reservations(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reservation_service.list_mine(&identity).await?))
}

pub async fn list_court_reservations(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(court_id): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<impl IntoResponse, AppError> {
    identity.require_manager()?;
    Ok(Json(state.reservation_service.list_by_court(&court_id, range.from, range.to).await?))
}

pub async fn get_reservation(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(reservation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reservation_service.get(&identity, &reservation_id).await?))
}

pub async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(reservation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.reservation_service.delete(&identity, &reservation_id).await?;
    Ok(Json(serde_json::json!({"status": "deleted"})))
}

pub async fn confirm_reservation(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(reservation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reservation_service.confirm(&identity, &reservation_id).await?))
}

pub async fn cancellation_quote(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(reservation_id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.reservation_service.quote_cancellation(&identity, &reservation_id, query.waive_penalty).await?))
}

pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(reservation_id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.reservation_service.cancel(&identity, &reservation_id, query.waive_penalty).await?;
    Ok(Json(CancellationResponse {
        reservation: outcome.reservation,
        refund: outcome.quote,
        already_cancelled: outcome.already_cancelled,
    }))
}

pub async fn pay_reservation(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(reservation_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let payment = state.reservation_service.pay(&identity, &reservation_id).await?;
    Ok((StatusCode::ACCEPTED, Json(payment)))
}
