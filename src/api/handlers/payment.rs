use axum::{extract::State, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::ProcessorCallback;
use crate::domain::models::payment::PaymentEvent;
use crate::error::AppError;
use std::sync::Arc;

/// Settlement callback. Redelivery of an already-applied event answers `duplicate`.
pub async fn payment_event(
    State(state): State<Arc<AppState>>,
    _caller: ProcessorCallback,
    Json(event): Json<PaymentEvent>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.payment_service.handle_event(&event).await?))
}
