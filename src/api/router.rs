use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, put, delete},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{health, account, court, blackout, availability, reservation, recurring, credit, referral, payment};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Accounts
        .route("/api/v1/accounts/sync", post(account::sync_account))
        .route("/api/v1/accounts/me", get(account::get_me))
        .route("/api/v1/accounts", get(account::list_accounts))
        .route("/api/v1/accounts/{account_id}/status", put(account::set_account_status))

        // Catalog
        .route("/api/v1/courts", post(court::create_court).get(court::list_courts))
        .route("/api/v1/courts/{court_id}", get(court::get_court).put(court::update_court))
        .route("/api/v1/courts/{court_id}/slots", post(court::create_slot).get(court::list_slots))
        .route("/api/v1/slots/{slot_id}", put(court::update_slot))

        // Blackouts
        .route("/api/v1/courts/{court_id}/blackouts", post(blackout::create_blackout).get(blackout::list_blackouts))
        .route("/api/v1/blackouts/{blackout_id}", delete(blackout::delete_blackout))

        // Availability
        .route("/api/v1/courts/{court_id}/availability", get(availability::check_availability))
        .route("/api/v1/courts/{court_id}/availability/week", get(availability::weekly_grid))

        // Reservations
        .route("/api/v1/reservations", post(reservation::create_reservation))
        .route("/api/v1/reservations/me", get(reservation::list_my_reservations))
        .route("/api/v1/reservations/{reservation_id}", get(reservation::get_reservation).delete(reservation::delete_reservation))
        .route("/api/v1/reservations/{reservation_id}/confirm", post(reservation::confirm_reservation))
        .route("/api/v1/reservations/{reservation_id}/cancellation-quote", get(reservation::cancellation_quote))
        .route("/api/v1/reservations/{reservation_id}/cancel", post(reservation::cancel_reservation))
        .route("/api/v1/reservations/{reservation_id}/pay", post(reservation::pay_reservation))
        .route("/api/v1/courts/{court_id}/reservations", get(reservation::list_court_reservations))

        // Recurring
        .route("/api/v1/recurring", post(recurring::create_template))
        .route("/api/v1/recurring/me", get(recurring::list_my_templates))
        .route("/api/v1/recurring/{template_id}", get(recurring::get_template))
        .route("/api/v1/recurring/{template_id}/end", post(recurring::end_template))
        .route("/api/v1/recurring/{template_id}/pause", post(recurring::pause_template))
        .route("/api/v1/recurring/{template_id}/resume", post(recurring::resume_template))
        .route("/api/v1/recurring/{template_id}/expand", post(recurring::expand_template))
        .route("/api/v1/recurring/{template_id}/gaps", get(recurring::list_gaps))

        // Credits
        .route("/api/v1/credits/me", get(credit::my_balance))
        .route("/api/v1/credits/me/transactions", get(credit::my_transactions))
        .route("/api/v1/accounts/{account_id}/credits", post(credit::adjust_credits))
        .route("/api/v1/accounts/{account_id}/credits/expire", post(credit::expire_credits))
        .route("/api/v1/accounts/{account_id}/credits/audit", get(credit::audit_ledger))

        // Referrals
        .route("/api/v1/referrals/code", post(referral::issue_code))
        .route("/api/v1/referrals/code/active", put(referral::set_code_active))
        .route("/api/v1/referrals/redeem", post(referral::redeem_code))
        .route("/api/v1/referrals/me", get(referral::my_referrals))
        .route("/api/v1/referrals/stats", get(referral::referral_stats))

        // Payment processor callbacks
        .route("/api/v1/payments/events", post(payment::payment_event))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        account_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
