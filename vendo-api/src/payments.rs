use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vendo_core::intent::{CartItem, PaymentMethod, PaymentStatus};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_ref: Option<Uuid>,
    /// Opaque payer identity supplied by the auth layer
    pub payer_ref: String,
    pub cart_items: Vec<CartItem>,
    pub method: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentResponse {
    pub intent_id: String,
    pub order_ref: Uuid,
    pub redirect_target: String,
    pub method: PaymentMethod,
    pub amount: i64,
    pub currency: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub status: PaymentStatus,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodsResponse {
    pub payment_methods: Vec<PaymentMethodInfo>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/payments/create
/// Register a payment for a cart and hand back the redirect target
pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<CreatePaymentResponse>, AppError> {
    let method: PaymentMethod = req.method.parse()?;

    let intent = state
        .manager
        .create(req.order_ref, &req.payer_ref, &req.cart_items, method)
        .await?;

    Ok(Json(CreatePaymentResponse {
        intent_id: intent.intent_id,
        order_ref: intent.order_ref,
        redirect_target: intent.redirect_target,
        method: intent.method,
        amount: intent.amount,
        currency: intent.currency,
        expires_at: intent.expires_at,
    }))
}

/// GET /api/payments/status/{intent_id}
/// Reconcile the intent against the gateway and report its status
pub async fn payment_status(
    State(state): State<AppState>,
    Path(intent_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, AppError> {
    let intent = state.manager.poll_status(&intent_id).await?;

    Ok(Json(PaymentStatusResponse {
        status: intent.status,
        message: intent.provider_message,
    }))
}

/// GET /api/payments/methods
/// Supported payment channels for the checkout page
pub async fn payment_methods() -> Json<PaymentMethodsResponse> {
    let payment_methods = vec![
        PaymentMethodInfo {
            id: PaymentMethod::Qr.as_str(),
            name: "QR Code",
            description: "Scan a QR code with the wallet app to pay",
        },
        PaymentMethodInfo {
            id: PaymentMethod::App.as_str(),
            name: "Wallet App",
            description: "Pay directly inside the wallet app",
        },
        PaymentMethodInfo {
            id: PaymentMethod::Web.as_str(),
            name: "Web Checkout",
            description: "Pay on the provider's hosted checkout page",
        },
    ];

    Json(PaymentMethodsResponse { payment_methods })
}
