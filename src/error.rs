use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::models::availability::Unavailability;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Slot unavailable: {0}")]
    SlotUnavailable(Unavailability),
    #[error("Invalid transition: cannot {action} a {from} {entity}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        action: String,
    },
    #[error("Insufficient balance: requested {requested_cents}, available {available_cents}")]
    InsufficientBalance {
        available_cents: i64,
        requested_cents: i64,
    },
    #[error("Account already redeemed a referral")]
    AlreadyRedeemed,
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

/// 2067 / 1555 = SQLite unique / primary key constraint, 23505 = PostgreSQL unique violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err.as_database_error() {
        Some(db_err) => {
            let code = db_err.code().unwrap_or_default();
            code == "2067" || code == "1555" || code == "23505"
        }
        None => false,
    }
}

impl AppError {
    pub fn is_conflict(&self) -> bool {
        match self {
            AppError::Conflict(_) | AppError::SlotUnavailable(_) => true,
            AppError::Database(e) => is_unique_violation(e),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Database(e) => {
                if is_unique_violation(e) {
                    return (
                        StatusCode::CONFLICT,
                        Json(json!({ "error": "Resource already exists (duplicate entry)" }))
                    ).into_response();
                }

                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error" }))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::SlotUnavailable(reason) => {
                let mut body = serde_json::to_value(reason).unwrap_or_else(|_| json!({}));
                body["error"] = json!(reason.to_string());
                (StatusCode::CONFLICT, body)
            }
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, json!({ "error": self.to_string() })),
            AppError::InsufficientBalance { available_cents, requested_cents } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": self.to_string(),
                    "available_cents": available_cents,
                    "requested_cents": requested_cents,
                })
            ),
            AppError::AlreadyRedeemed => (StatusCode::CONFLICT, json!({ "error": self.to_string() })),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error" })),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}
