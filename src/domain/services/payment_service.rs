use std::sync::Arc;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::models::payment::{Payment, PaymentEvent, PaymentOutcome};
use crate::domain::ports::PaymentRepository;
use crate::domain::services::reservation_service::ReservationService;
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDisposition {
    Applied,
    Duplicate,
}

#[derive(Debug, Serialize)]
pub struct EventReceipt {
    pub status: EventDisposition,
    pub payment: Payment,
}

/// Inbound side of the payment processor. Every event may arrive more than once.
pub struct PaymentService {
    payment_repo: Arc<dyn PaymentRepository>,
    reservations: Arc<ReservationService>,
}

impl PaymentService {
    pub fn new(payment_repo: Arc<dyn PaymentRepository>, reservations: Arc<ReservationService>) -> Self {
        Self { payment_repo, reservations }
    }

    pub async fn handle_event(&self, event: &PaymentEvent) -> Result<EventReceipt, AppError> {
        let now = Utc::now();
        let provider_reference = event.provider_reference.as_deref();

        let applied = match event.outcome {
            PaymentOutcome::Settled => {
                match self.payment_repo.settle(&event.request_id, provider_reference, now).await? {
                    Some(result) => {
                        if result.refunded_late {
                            warn!(
                                reservation_id = %result.reservation.id,
                                request_id = %event.request_id,
                                "Payment settled after cancellation, credited back"
                            );
                        }
                        if result.confirmed {
                            info!(reservation_id = %result.reservation.id, "Reservation confirmed by settlement");
                            self.reservations.after_confirmation(&result.reservation).await;
                        }
                        Some(result.payment)
                    }
                    None => None,
                }
            }
            PaymentOutcome::Failed => self.payment_repo.fail(&event.request_id, provider_reference, now).await?,
            PaymentOutcome::Refunded => self.payment_repo.refund(&event.request_id, provider_reference, now).await?,
        };

        if let Some(payment) = applied {
            info!(request_id = %event.request_id, reservation_id = %payment.reservation_id, "Payment event {} applied", event.outcome);
            return Ok(EventReceipt { status: EventDisposition::Applied, payment });
        }

        let payment = self.payment_repo.find_by_request_id(&event.request_id).await?
            .ok_or(AppError::NotFound("Unknown payment request".into()))?;

        info!(
            request_id = %event.request_id,
            "Payment event {} ignored, payment already {} (expected {})",
            event.outcome, payment.status, event.outcome.expected_status()
        );
        Ok(EventReceipt { status: EventDisposition::Duplicate, payment })
    }
}
