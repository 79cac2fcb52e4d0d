use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthAccount;
use crate::api::dtos::requests::{AvailabilityQuery, WeekQuery};
use crate::error::AppError;
use std::sync::Arc;

pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    _account: AuthAccount,
    Path(court_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let availability = state.availability_service.check(&court_id, query.date, query.start, query.end).await?;
    Ok(Json(availability))
}

pub async fn weekly_grid(
    State(state): State<Arc<AppState>>,
    _account: AuthAccount,
    Path(court_id): Path<String>,
    Query(query): Query<WeekQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.availability_service.weekly_grid(&court_id, query.start).await?))
}
