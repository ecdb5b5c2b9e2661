use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use vendo_payment::PaymentManager;

/// Background sweep that drives `expire` for overdue intents. This is the
/// caller-side timer the lifecycle manager expects; the manager itself never
/// expires anything on its own clock.
pub async fn start_expiry_sweeper(manager: Arc<PaymentManager>, sweep_interval_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(sweep_interval_seconds));
    info!(
        sweep_interval_seconds,
        "expiry sweeper started, watching pending payments"
    );

    loop {
        ticker.tick().await;

        let due = manager.due_intents().await;
        if due.is_empty() {
            continue;
        }

        info!(count = due.len(), "expiring overdue payment intents");
        for intent_id in due {
            if let Err(e) = manager.expire(&intent_id).await {
                error!(%intent_id, error = %e, "failed to expire intent");
            }
        }
    }
}
