use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use vendo_core::error::PaymentError;
use vendo_core::gateway::{GatewayClient, GatewayOrder, GatewayStatus, RegisterRequest};
use vendo_core::intent::PaymentMethod;

/// Scriptable in-memory gateway for tests. Status answers are queued with
/// [`MockGateway::push_status`]; the last one keeps repeating, so an
/// "unchanged gateway response" is the default between pushes.
pub struct MockGateway {
    sequence: AtomicU64,
    statuses: Mutex<VecDeque<GatewayStatus>>,
    register_failure: Mutex<Option<PaymentError>>,
    query_failure: Mutex<Option<PaymentError>>,
    registrations: Mutex<Vec<RegisterRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
            statuses: Mutex::new(VecDeque::new()),
            register_failure: Mutex::new(None),
            query_failure: Mutex::new(None),
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Queue a status answer for subsequent `query_status` calls
    pub async fn push_status(&self, status: GatewayStatus) {
        self.statuses.lock().await.push_back(status);
    }

    /// Make the next `register_transaction` call fail with the given error
    pub async fn fail_next_register(&self, error: PaymentError) {
        *self.register_failure.lock().await = Some(error);
    }

    /// Make the next `query_status` call fail with the given error
    pub async fn fail_next_query(&self, error: PaymentError) {
        *self.query_failure.lock().await = Some(error);
    }

    /// Every register request seen so far
    pub async fn registrations(&self) -> Vec<RegisterRequest> {
        self.registrations.lock().await.clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayClient for MockGateway {
    async fn register_transaction(
        &self,
        req: &RegisterRequest,
    ) -> Result<GatewayOrder, PaymentError> {
        if let Some(err) = self.register_failure.lock().await.take() {
            return Err(err);
        }

        self.registrations.lock().await.push(req.clone());

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let intent_id = format!("mock_{:06}_{}", seq, req.order_ref.simple());
        let redirect_target = match req.method {
            PaymentMethod::Qr => format!("zp-qr://{}", intent_id),
            _ => format!("https://gateway.test/pay/{}", intent_id),
        };

        Ok(GatewayOrder {
            intent_id,
            redirect_target,
        })
    }

    async fn query_status(&self, _intent_id: &str) -> Result<GatewayStatus, PaymentError> {
        if let Some(err) = self.query_failure.lock().await.take() {
            return Err(err);
        }

        let mut statuses = self.statuses.lock().await;
        let answer = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(answer.unwrap_or(GatewayStatus {
            code: 2,
            message: "processing".to_string(),
        }))
    }
}
