use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PaymentError;
use crate::intent::{CartItem, PaymentMethod};

/// What the manager sends when registering a transaction with the provider
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub order_ref: Uuid,
    pub payer_ref: String,
    pub amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub items: Vec<CartItem>,
}

/// Provider acknowledgement of a registered transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Provider-assigned transaction id (`app_trans_id`)
    pub intent_id: String,
    /// URL or QR payload the payer must act on
    pub redirect_target: String,
}

/// Raw status answer from the provider. The code is kept uninterpreted here;
/// mapping to a lifecycle status is the manager's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub code: i64,
    pub message: String,
}

/// Port to the external payment provider. Network calls only; no business
/// logic behind this trait.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Register a new transaction with the provider
    async fn register_transaction(&self, req: &RegisterRequest)
        -> Result<GatewayOrder, PaymentError>;

    /// Query the provider for the current transaction status
    async fn query_status(&self, intent_id: &str) -> Result<GatewayStatus, PaymentError>;
}
