use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthAccount;
use crate::api::dtos::requests::CreateRecurringRequest;
use crate::domain::services::recurrence::CreateTemplate;
use crate::error::AppError;
use std::sync::Arc;

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Json(payload): Json<CreateRecurringRequest>,
) -> Result<impl IntoResponse, AppError> {
    let template = state.recurring_service.create(&identity, CreateTemplate {
        court_id: payload.court_id,
        recurrence: payload.recurrence,
        weekdays: payload.weekdays,
        day_of_month: payload.day_of_month,
        start_time: payload.start_time,
        end_time: payload.end_time,
        participants: payload.participants,
        price_cents: payload.price_cents,
        discount_percent: payload.discount_percent,
        starts_on: payload.starts_on,
        ends_on: payload.ends_on,
    }).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn list_my_templates(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.recurring_service.list_mine(&identity).await?))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(template_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.recurring_service.get(&identity, &template_id).await?))
}

pub async fn list_gaps(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(template_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.recurring_service.gaps(&identity, &template_id).await?))
}

pub async fn end_template(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(template_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.recurring_service.end(&identity, &template_id).await?))
}

pub async fn pause_template(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(template_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.recurring_service.pause(&identity, &template_id).await?))
}

pub async fn resume_template(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(template_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.recurring_service.resume(&identity, &template_id).await?))
}

pub async fn expand_template(
    State(state): State<Arc<AppState>>,
    AuthAccount(identity): AuthAccount,
    Path(template_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.recurring_service.expand_now(&identity, &template_id).await?))
}
