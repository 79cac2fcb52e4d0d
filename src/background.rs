use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use crate::state::AppState;

const RECURRING_BATCH: i64 = 20;

pub async fn start_background_worker(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.policy.worker_interval_secs.max(1));
    info!("Starting background worker (every {:?})...", interval);

    loop {
        run_once(&state).await;
        sleep(interval).await;
    }
}

/// One pass over the periodic tasks. Each task logs its own failure.
pub async fn run_once(state: &AppState) {
    async {
        match state.recurring_service.run_due(RECURRING_BATCH).await {
            Ok(reports) if !reports.is_empty() => {
                let created: usize = reports.iter().map(|r| r.created.len()).sum();
                let gaps: usize = reports.iter().map(|r| r.gaps.len()).sum();
                info!(templates = reports.len(), created, gaps, "Recurring templates expanded");
            }
            Ok(_) => {}
            Err(e) => error!("Recurring expansion failed: {}", e),
        }
    }
        .instrument(info_span!("background_task", task = "recurring_expansion"))
        .await;

    async {
        match state.referral_service.reconcile_qualified().await {
            Ok(0) => {}
            Ok(accepted) => info!(accepted, "Qualified referrals accepted"),
            Err(e) => error!("Referral reconciliation failed: {}", e),
        }
    }
        .instrument(info_span!("background_task", task = "referral_reconcile"))
        .await;

    async {
        match state.referral_service.expire_stale().await {
            Ok(0) => {}
            Ok(expired) => info!(expired, "Stale referrals expired"),
            Err(e) => error!("Referral expiry failed: {}", e),
        }
    }
        .instrument(info_span!("background_task", task = "referral_expiry"))
        .await;

    async {
        match state.reservation_service.release_expired_holds().await {
            Ok(0) => {}
            Ok(released) => info!(released, "Expired pending holds released"),
            Err(e) => error!("Hold release failed: {}", e),
        }
    }
        .instrument(info_span!("background_task", task = "pending_hold_release"))
        .await;
}
