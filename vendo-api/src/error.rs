use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use vendo_core::error::{PaymentError, StoreError};

#[derive(Debug)]
pub struct AppError(pub PaymentError);

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self.0 {
            PaymentError::InvalidCart(_) | PaymentError::UnsupportedMethod(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            PaymentError::GatewayRejected(_) => (StatusCode::PAYMENT_REQUIRED, self.0.to_string()),
            PaymentError::UnknownIntent(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            PaymentError::ActiveIntentExists(_) => (StatusCode::CONFLICT, self.0.to_string()),
            PaymentError::StaleIntent(_) => (StatusCode::GONE, self.0.to_string()),
            PaymentError::GatewayUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
            PaymentError::Store(StoreError::OrderNotFound(_)) => {
                (StatusCode::NOT_FOUND, self.0.to_string())
            }
            PaymentError::Store(err) => {
                tracing::error!("Order store failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
