use uuid::Uuid;

/// Failures the lifecycle manager can surface to callers.
///
/// Transient variants are safe to retry with backoff; everything else is
/// permanent and must be surfaced immediately.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid cart: {0}")]
    InvalidCart(String),

    #[error("Unsupported payment method: {0}")]
    UnsupportedMethod(String),

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Payment gateway rejected the transaction: {0}")]
    GatewayRejected(String),

    #[error("Unknown payment intent: {0}")]
    UnknownIntent(String),

    #[error("Payment intent {0} expired before the gateway responded")]
    StaleIntent(String),

    #[error("An active payment already exists for order {0}")]
    ActiveIntentExists(Uuid),

    #[error("Order store failure: {0}")]
    Store(#[from] StoreError),
}

impl PaymentError {
    /// Only gateway outages are retry-eligible; every other failure is
    /// permanent from the caller's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::GatewayUnavailable(_))
    }
}

/// Failures from the order store collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order store unavailable: {0}")]
    Unavailable(String),
}

pub type PaymentResult<T> = Result<T, PaymentError>;
