use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use vendo_core::error::{PaymentError, PaymentResult, StoreError};
use vendo_core::gateway::{GatewayClient, RegisterRequest};
use vendo_core::intent::{cart_total, CartItem, PaymentIntent, PaymentMethod, PaymentStatus};
use vendo_core::order_store::OrderStore;

/// Owns the full lifecycle of payment intents: creation against the gateway,
/// status reconciliation across the polling loop, and terminal resolution.
///
/// Each intent lives behind its own async lock, so mutations of one intent
/// serialize while operations on different intents proceed concurrently.
pub struct PaymentManager {
    gateway: Arc<dyn GatewayClient>,
    orders: Arc<dyn OrderStore>,
    currency: String,
    intent_ttl: Duration,
    intents: RwLock<HashMap<String, Arc<Mutex<PaymentIntent>>>>,
    /// One non-terminal intent per order. `None` marks a creation in flight.
    active_by_order: Mutex<HashMap<Uuid, Option<String>>>,
}

impl PaymentManager {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        orders: Arc<dyn OrderStore>,
        currency: String,
        intent_ttl_seconds: u64,
    ) -> Self {
        Self {
            gateway,
            orders,
            currency,
            intent_ttl: Duration::seconds(intent_ttl_seconds as i64),
            intents: RwLock::new(HashMap::new()),
            active_by_order: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new payment for a cart. Returns the stored intent with
    /// `PENDING` status and the redirect target the client must act on.
    pub async fn create(
        &self,
        order_ref: Option<Uuid>,
        payer_ref: &str,
        items: &[CartItem],
        method: PaymentMethod,
    ) -> PaymentResult<PaymentIntent> {
        validate_cart(items)?;
        let amount = cart_total(items);

        let order_ref = match order_ref {
            Some(id) => {
                if !self.orders.order_exists(id).await? {
                    return Err(StoreError::OrderNotFound(id).into());
                }
                id
            }
            None => self.orders.create_order(payer_ref, items).await?,
        };

        // Reserve the order's active slot before talking to the gateway, so
        // a concurrent create for the same order conflicts instead of racing.
        {
            let mut active = self.active_by_order.lock().await;
            if active.contains_key(&order_ref) {
                return Err(PaymentError::ActiveIntentExists(order_ref));
            }
            active.insert(order_ref, None);
        }

        let request = RegisterRequest {
            order_ref,
            payer_ref: payer_ref.to_string(),
            amount,
            currency: self.currency.clone(),
            method,
            items: items.to_vec(),
        };

        let registered = match self.gateway.register_transaction(&request).await {
            Ok(r) => r,
            Err(e) => {
                self.active_by_order.lock().await.remove(&order_ref);
                return Err(e);
            }
        };

        let mut intent = PaymentIntent::new(
            registered.intent_id.clone(),
            order_ref,
            method,
            amount,
            self.currency.clone(),
            registered.redirect_target,
            self.intent_ttl,
        );
        intent.status = PaymentStatus::Pending;

        tracing::info!(
            intent_id = %intent.intent_id,
            order_ref = %order_ref,
            %method,
            amount,
            "payment intent created"
        );

        self.intents
            .write()
            .await
            .insert(intent.intent_id.clone(), Arc::new(Mutex::new(intent.clone())));
        self.active_by_order
            .lock()
            .await
            .insert(order_ref, Some(intent.intent_id.clone()));

        Ok(intent)
    }

    /// Query the gateway and reconcile the stored intent. Idempotent: an
    /// unchanged gateway answer produces no additional transition, and a
    /// terminal intent is returned as-is without touching the gateway.
    pub async fn poll_status(&self, intent_id: &str) -> PaymentResult<PaymentIntent> {
        let entry = self.lookup(intent_id).await?;
        let mut intent = entry.lock().await;

        if intent.is_terminal() {
            return Ok(intent.clone());
        }

        // Local expiry wins over whatever the gateway would answer.
        if intent.is_past_expiry(Utc::now()) {
            if let Err(e) = self
                .finalize(&mut intent, PaymentStatus::Expired, "payment window elapsed")
                .await
            {
                tracing::error!(intent_id = %intent.intent_id, error = %e, "failed to record expiry outcome");
            }
            return Err(PaymentError::StaleIntent(intent.intent_id.clone()));
        }

        let answer = self.gateway.query_status(intent_id).await?;
        intent.last_checked_at = Some(Utc::now());

        match map_gateway_code(answer.code) {
            PaymentStatus::Pending => {
                tracing::debug!(intent_id = %intent.intent_id, "gateway still processing");
            }
            terminal => {
                if intent.status.can_transition_to(terminal) {
                    self.finalize(&mut intent, terminal, &answer.message).await?;
                }
            }
        }

        Ok(intent.clone())
    }

    /// Move a `PENDING` intent past its deadline to `EXPIRED`. No-op on
    /// terminal intents and on intents that are not yet due.
    pub async fn expire(&self, intent_id: &str) -> PaymentResult<PaymentIntent> {
        let entry = self.lookup(intent_id).await?;
        let mut intent = entry.lock().await;

        if intent.is_terminal() || !intent.is_past_expiry(Utc::now()) {
            return Ok(intent.clone());
        }

        self.finalize(&mut intent, PaymentStatus::Expired, "payment window elapsed")
            .await?;
        Ok(intent.clone())
    }

    /// Read an intent without touching the gateway
    pub async fn intent(&self, intent_id: &str) -> PaymentResult<PaymentIntent> {
        let entry = self.lookup(intent_id).await?;
        let intent = entry.lock().await;
        Ok(intent.clone())
    }

    /// Ids of pending intents whose deadline has passed, for the sweeper
    pub async fn due_intents(&self) -> Vec<String> {
        let entries: Vec<Arc<Mutex<PaymentIntent>>> =
            self.intents.read().await.values().cloned().collect();

        let now = Utc::now();
        let mut due = Vec::new();
        for entry in entries {
            let intent = entry.lock().await;
            if !intent.is_terminal() && intent.is_past_expiry(now) {
                due.push(intent.intent_id.clone());
            }
        }
        due
    }

    async fn lookup(&self, intent_id: &str) -> PaymentResult<Arc<Mutex<PaymentIntent>>> {
        self.intents
            .read()
            .await
            .get(intent_id)
            .cloned()
            .ok_or_else(|| PaymentError::UnknownIntent(intent_id.to_string()))
    }

    /// Apply a terminal transition: record the provider message, release the
    /// order's active slot and notify the order store exactly once.
    async fn finalize(
        &self,
        intent: &mut PaymentIntent,
        status: PaymentStatus,
        message: &str,
    ) -> Result<(), StoreError> {
        debug_assert!(status.is_terminal());
        let from = intent.status;
        intent.status = status;
        intent.provider_message = Some(message.to_string());

        tracing::info!(
            intent_id = %intent.intent_id,
            order_ref = %intent.order_ref,
            %from,
            to = %status,
            "payment intent resolved"
        );

        self.active_by_order.lock().await.remove(&intent.order_ref);
        self.orders.record_outcome(intent.order_ref, status).await
    }
}

fn validate_cart(items: &[CartItem]) -> PaymentResult<()> {
    if items.is_empty() {
        return Err(PaymentError::InvalidCart("cart is empty".to_string()));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(PaymentError::InvalidCart(format!(
                "item {} has zero quantity",
                item.product_id
            )));
        }
        if item.unit_price <= 0 {
            return Err(PaymentError::InvalidCart(format!(
                "item {} has a non-positive price",
                item.product_id
            )));
        }
    }
    if cart_total(items) <= 0 {
        return Err(PaymentError::InvalidCart(
            "cart total must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Gateway code mapping: 1 confirms the payment, 2 means still processing,
/// anything else is a rejection carrying the provider message.
fn map_gateway_code(code: i64) -> PaymentStatus {
    match code {
        1 => PaymentStatus::Succeeded,
        2 => PaymentStatus::Pending,
        _ => PaymentStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGateway;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vendo_core::gateway::GatewayStatus;

    struct RecordingStore {
        outcomes: Mutex<Vec<(Uuid, PaymentStatus)>>,
        created: AtomicUsize,
    }

    impl RecordingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(Vec::new()),
                created: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl OrderStore for RecordingStore {
        async fn create_order(
            &self,
            _payer_ref: &str,
            _items: &[CartItem],
        ) -> Result<Uuid, StoreError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Uuid::new_v4())
        }

        async fn order_exists(&self, _order_ref: Uuid) -> Result<bool, StoreError> {
            Ok(true)
        }

        async fn record_outcome(
            &self,
            order_ref: Uuid,
            status: PaymentStatus,
        ) -> Result<(), StoreError> {
            self.outcomes.lock().await.push((order_ref, status));
            Ok(())
        }
    }

    fn cart() -> Vec<CartItem> {
        vec![
            CartItem {
                product_id: Uuid::new_v4(),
                name: "Pho bo".to_string(),
                unit_price: 50000,
                quantity: 2,
            },
            CartItem {
                product_id: Uuid::new_v4(),
                name: "Tra da".to_string(),
                unit_price: 50000,
                quantity: 1,
            },
        ]
    }

    fn manager_with(
        gateway: Arc<MockGateway>,
        store: Arc<RecordingStore>,
        ttl_seconds: u64,
    ) -> PaymentManager {
        PaymentManager::new(gateway, store, "VND".to_string(), ttl_seconds)
    }

    #[tokio::test]
    async fn create_produces_pending_intent_with_redirect() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway.clone(), store, 900);

        let intent = manager
            .create(None, "user_7", &cart(), PaymentMethod::Qr)
            .await
            .unwrap();

        assert_eq!(intent.status, PaymentStatus::Pending);
        assert_eq!(intent.amount, 150000);
        assert_eq!(intent.currency, "VND");
        assert!(!intent.redirect_target.is_empty());

        let registrations = gateway.registrations().await;
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].amount, 150000);
        assert_eq!(registrations[0].items.len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_empty_cart_without_storing() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway, store.clone(), 900);

        let err = manager
            .create(None, "user_7", &[], PaymentMethod::Qr)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::InvalidCart(_)));
        assert_eq!(store.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn create_conflicts_while_an_intent_is_active() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway, store, 900);

        let order_ref = Uuid::new_v4();
        manager
            .create(Some(order_ref), "user_7", &cart(), PaymentMethod::App)
            .await
            .unwrap();

        let err = manager
            .create(Some(order_ref), "user_7", &cart(), PaymentMethod::Qr)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::ActiveIntentExists(o) if o == order_ref));
    }

    #[tokio::test]
    async fn create_releases_the_order_slot_when_the_gateway_rejects() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway.clone(), store, 900);
        let order_ref = Uuid::new_v4();

        gateway
            .fail_next_register(PaymentError::GatewayRejected("amount too low".to_string()))
            .await;
        let err = manager
            .create(Some(order_ref), "user_7", &cart(), PaymentMethod::Web)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::GatewayRejected(_)));

        // The order is free for a second attempt.
        let intent = manager
            .create(Some(order_ref), "user_7", &cart(), PaymentMethod::Web)
            .await
            .unwrap();
        assert_eq!(intent.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn poll_maps_success_and_notifies_the_store_once() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway.clone(), store.clone(), 900);

        let intent = manager
            .create(None, "user_7", &cart(), PaymentMethod::Qr)
            .await
            .unwrap();

        gateway.push_status(GatewayStatus {
            code: 1,
            message: "success".to_string(),
        })
        .await;

        let polled = manager.poll_status(&intent.intent_id).await.unwrap();
        assert_eq!(polled.status, PaymentStatus::Succeeded);
        assert!(polled.last_checked_at.is_some());

        // Second poll with the gateway already resolved: identical state,
        // no extra outcome notification.
        let again = manager.poll_status(&intent.intent_id).await.unwrap();
        assert_eq!(again.status, PaymentStatus::Succeeded);
        assert_eq!(again.last_checked_at, polled.last_checked_at);

        let outcomes = store.outcomes.lock().await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0], (intent.order_ref, PaymentStatus::Succeeded));
    }

    #[tokio::test]
    async fn poll_is_idempotent_while_pending() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway.clone(), store.clone(), 900);

        let intent = manager
            .create(None, "user_7", &cart(), PaymentMethod::Qr)
            .await
            .unwrap();

        gateway.push_status(GatewayStatus {
            code: 2,
            message: "processing".to_string(),
        })
        .await;

        let first = manager.poll_status(&intent.intent_id).await.unwrap();
        let second = manager.poll_status(&intent.intent_id).await.unwrap();
        assert_eq!(first.status, PaymentStatus::Pending);
        assert_eq!(second.status, PaymentStatus::Pending);
        assert!(store.outcomes.lock().await.is_empty());
    }

    #[tokio::test]
    async fn poll_maps_unknown_codes_to_failed_with_message() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway.clone(), store.clone(), 900);

        let intent = manager
            .create(None, "user_7", &cart(), PaymentMethod::App)
            .await
            .unwrap();

        gateway.push_status(GatewayStatus {
            code: 3,
            message: "payer cancelled".to_string(),
        })
        .await;

        let polled = manager.poll_status(&intent.intent_id).await.unwrap();
        assert_eq!(polled.status, PaymentStatus::Failed);
        assert_eq!(polled.provider_message.as_deref(), Some("payer cancelled"));

        let outcomes = store.outcomes.lock().await;
        assert_eq!(outcomes[0].1, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn poll_on_unknown_intent_fails() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway, store, 900);

        let err = manager.poll_status("does-not-exist").await.unwrap_err();
        assert!(matches!(err, PaymentError::UnknownIntent(_)));
    }

    #[tokio::test]
    async fn poll_after_local_expiry_is_stale_and_never_overwritten() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway.clone(), store.clone(), 0);

        let intent = manager
            .create(None, "user_7", &cart(), PaymentMethod::Qr)
            .await
            .unwrap();

        // Gateway would report success, but the intent is already past its
        // deadline locally.
        gateway.push_status(GatewayStatus {
            code: 1,
            message: "success".to_string(),
        })
        .await;

        let err = manager.poll_status(&intent.intent_id).await.unwrap_err();
        assert!(matches!(err, PaymentError::StaleIntent(_)));

        let stored = manager.intent(&intent.intent_id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Expired);

        let outcomes = store.outcomes.lock().await;
        assert_eq!(outcomes[0].1, PaymentStatus::Expired);
    }

    #[tokio::test]
    async fn expire_moves_overdue_pending_and_ignores_terminal() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway.clone(), store.clone(), 0);

        let intent = manager
            .create(None, "user_7", &cart(), PaymentMethod::Web)
            .await
            .unwrap();

        let expired = manager.expire(&intent.intent_id).await.unwrap();
        assert_eq!(expired.status, PaymentStatus::Expired);

        // A second expire is a no-op on the terminal intent.
        let again = manager.expire(&intent.intent_id).await.unwrap();
        assert_eq!(again.status, PaymentStatus::Expired);
        assert_eq!(store.outcomes.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn expire_before_the_deadline_is_a_no_op() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway, store.clone(), 900);

        let intent = manager
            .create(None, "user_7", &cart(), PaymentMethod::Qr)
            .await
            .unwrap();

        let untouched = manager.expire(&intent.intent_id).await.unwrap();
        assert_eq!(untouched.status, PaymentStatus::Pending);
        assert!(store.outcomes.lock().await.is_empty());
    }

    #[tokio::test]
    async fn order_can_be_paid_again_after_a_failed_intent() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let manager = manager_with(gateway.clone(), store, 900);
        let order_ref = Uuid::new_v4();

        let first = manager
            .create(Some(order_ref), "user_7", &cart(), PaymentMethod::Qr)
            .await
            .unwrap();

        gateway.push_status(GatewayStatus {
            code: -49,
            message: "expired at provider".to_string(),
        })
        .await;
        manager.poll_status(&first.intent_id).await.unwrap();

        let second = manager
            .create(Some(order_ref), "user_7", &cart(), PaymentMethod::App)
            .await
            .unwrap();
        assert_ne!(second.intent_id, first.intent_id);
        assert_eq!(second.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn due_intents_lists_only_overdue_pending() {
        let gateway = MockGateway::shared();
        let store = RecordingStore::new();
        let short = manager_with(gateway.clone(), store, 0);

        let overdue = short
            .create(None, "user_7", &cart(), PaymentMethod::Qr)
            .await
            .unwrap();

        let due = short.due_intents().await;
        assert_eq!(due, vec![overdue.intent_id.clone()]);

        short.expire(&overdue.intent_id).await.unwrap();
        assert!(short.due_intents().await.is_empty());
    }
}
