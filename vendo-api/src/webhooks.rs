use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GatewayCallback {
    /// Raw JSON string as signed by the provider
    pub data: String,
    pub mac: String,
}

/// Acknowledgement body the provider expects; always HTTP 200
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub return_code: i64,
    pub return_message: String,
}

impl CallbackAck {
    fn new(return_code: i64, return_message: impl Into<String>) -> Json<Self> {
        Json(Self {
            return_code,
            return_message: return_message.into(),
        })
    }
}

/// POST /api/payments/callback
/// Receive payment notifications from the gateway. The MAC is checked before
/// anything else; reconciliation then goes through the same status query the
/// polling path uses, so a forged callback can never flip an intent.
pub async fn handle_gateway_callback(
    State(state): State<AppState>,
    Json(payload): Json<GatewayCallback>,
) -> Json<CallbackAck> {
    if !state.zalopay.verify_callback(&payload.data, &payload.mac) {
        tracing::warn!("callback rejected: mac mismatch");
        return CallbackAck::new(-1, "mac not equal");
    }

    let data: serde_json::Value = match serde_json::from_str(&payload.data) {
        Ok(v) => v,
        Err(e) => return CallbackAck::new(0, format!("malformed data: {}", e)),
    };

    let intent_id = match data["app_trans_id"].as_str() {
        Some(id) => id,
        None => return CallbackAck::new(0, "missing app_trans_id"),
    };

    match state.manager.poll_status(intent_id).await {
        Ok(intent) => {
            tracing::info!(
                intent_id,
                status = %intent.status,
                "callback reconciled"
            );
            CallbackAck::new(1, "success")
        }
        Err(e) => {
            tracing::warn!(intent_id, error = %e, "callback reconciliation failed");
            CallbackAck::new(0, e.to_string())
        }
    }
}
