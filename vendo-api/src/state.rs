use std::sync::Arc;

use vendo_payment::PaymentManager;
use vendo_store::ZaloPayClient;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<PaymentManager>,
    /// Used by the callback route to verify provider MACs
    pub zalopay: Arc<ZaloPayClient>,
}
