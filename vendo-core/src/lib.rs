pub mod error;
pub mod gateway;
pub mod intent;
pub mod order_store;

pub use error::{PaymentError, PaymentResult, StoreError};
pub use gateway::{GatewayClient, GatewayOrder, GatewayStatus, RegisterRequest};
pub use intent::{cart_total, CartItem, PaymentIntent, PaymentMethod, PaymentStatus};
pub use order_store::OrderStore;
