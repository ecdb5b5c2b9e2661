use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use vendo_core::error::PaymentResult;
use vendo_core::intent::PaymentIntent;

use crate::manager::PaymentManager;

/// Cadence and backoff of the caller-driven polling loop
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay between polls while the gateway keeps answering
    pub interval: Duration,
    /// Cap for the backoff applied on transient gateway failures
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
        }
    }
}

/// How a polling loop ended
#[derive(Debug)]
pub enum PollOutcome {
    /// The intent reached a terminal status
    Resolved(PaymentIntent),
    /// The caller cancelled; the stored intent is untouched
    Cancelled,
}

/// Poll until the intent resolves, a permanent error surfaces, or the caller
/// flips the cancellation flag. Transient gateway outages double the delay up
/// to the policy cap; a successful answer resets it.
pub async fn poll_until_terminal(
    manager: &PaymentManager,
    intent_id: &str,
    policy: &PollPolicy,
    mut cancel: watch::Receiver<bool>,
) -> PaymentResult<PollOutcome> {
    let mut delay = policy.interval;

    loop {
        if *cancel.borrow() {
            return Ok(PollOutcome::Cancelled);
        }

        match manager.poll_status(intent_id).await {
            Ok(intent) if intent.is_terminal() => return Ok(PollOutcome::Resolved(intent)),
            Ok(_) => {
                delay = policy.interval;
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(intent_id, error = %e, "gateway unavailable, backing off");
                delay = (delay * 2).min(policy.max_interval);
            }
            Err(e) => return Err(e),
        }

        tokio::select! {
            _ = sleep(delay) => {}
            changed = cancel.changed() => {
                // A dropped sender ends the loop the same way an explicit
                // cancel does.
                if changed.is_err() || *cancel.borrow() {
                    return Ok(PollOutcome::Cancelled);
                }
            }
        }
    }
}
