use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use vendo_core::error::StoreError;
use vendo_core::intent::{cart_total, CartItem, PaymentStatus};
use vendo_core::order_store::OrderStore;

/// Order record as the storefront sees it
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub order_ref: Uuid,
    pub payer_ref: String,
    pub items: Vec<CartItem>,
    pub total: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory order store, the development and test stand-in for the real
/// storefront order system.
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<Uuid, StoredOrder>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }

    pub async fn order(&self, order_ref: Uuid) -> Option<StoredOrder> {
        self.orders.read().await.get(&order_ref).cloned()
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, payer_ref: &str, items: &[CartItem]) -> Result<Uuid, StoreError> {
        let now = Utc::now();
        let order = StoredOrder {
            order_ref: Uuid::new_v4(),
            payer_ref: payer_ref.to_string(),
            items: items.to_vec(),
            total: cart_total(items),
            status: "AWAITING_PAYMENT".to_string(),
            created_at: now,
            updated_at: now,
        };

        let order_ref = order.order_ref;
        self.orders.write().await.insert(order_ref, order);
        tracing::debug!(%order_ref, payer_ref, "order created");
        Ok(order_ref)
    }

    async fn order_exists(&self, order_ref: Uuid) -> Result<bool, StoreError> {
        Ok(self.orders.read().await.contains_key(&order_ref))
    }

    async fn record_outcome(
        &self,
        order_ref: Uuid,
        status: PaymentStatus,
    ) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&order_ref)
            .ok_or(StoreError::OrderNotFound(order_ref))?;

        order.status = match status {
            PaymentStatus::Succeeded => "PAID".to_string(),
            PaymentStatus::Expired => "PAYMENT_EXPIRED".to_string(),
            _ => "PAYMENT_FAILED".to_string(),
        };
        order.updated_at = Utc::now();
        tracing::info!(%order_ref, status = %order.status, "order outcome recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> Vec<CartItem> {
        vec![CartItem {
            product_id: Uuid::new_v4(),
            name: "Goi cuon".to_string(),
            unit_price: 35000,
            quantity: 3,
        }]
    }

    #[tokio::test]
    async fn created_orders_await_payment() {
        let store = InMemoryOrderStore::new();
        let order_ref = store.create_order("user_7", &cart()).await.unwrap();

        let order = store.order(order_ref).await.unwrap();
        assert_eq!(order.status, "AWAITING_PAYMENT");
        assert_eq!(order.total, 105000);
        assert!(store.order_exists(order_ref).await.unwrap());
    }

    #[tokio::test]
    async fn outcomes_update_the_order_status() {
        let store = InMemoryOrderStore::new();
        let order_ref = store.create_order("user_7", &cart()).await.unwrap();

        store
            .record_outcome(order_ref, PaymentStatus::Succeeded)
            .await
            .unwrap();
        assert_eq!(store.order(order_ref).await.unwrap().status, "PAID");

        let missing = store
            .record_outcome(Uuid::new_v4(), PaymentStatus::Failed)
            .await;
        assert!(matches!(missing, Err(StoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn expiry_is_recorded_distinctly() {
        let store = InMemoryOrderStore::new();
        let order_ref = store.create_order("user_7", &cart()).await.unwrap();

        store
            .record_outcome(order_ref, PaymentStatus::Expired)
            .await
            .unwrap();
        assert_eq!(
            store.order(order_ref).await.unwrap().status,
            "PAYMENT_EXPIRED"
        );
    }
}
