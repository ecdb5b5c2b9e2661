use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::intent::{CartItem, PaymentStatus};

/// Port to the order system. It supplies order identifiers for carts and
/// receives the final payment outcome to mark an order paid or failed.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Create an order for the given cart and return its identifier
    async fn create_order(&self, payer_ref: &str, items: &[CartItem]) -> Result<Uuid, StoreError>;

    /// Confirm the order exists and is still payable
    async fn order_exists(&self, order_ref: Uuid) -> Result<bool, StoreError>;

    /// Record the terminal payment outcome for an order. `status` is always
    /// terminal when this is called.
    async fn record_outcome(&self, order_ref: Uuid, status: PaymentStatus)
        -> Result<(), StoreError>;
}
