use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Deserialize;
use sha2::Sha256;

use vendo_core::error::PaymentError;
use vendo_core::gateway::{GatewayClient, GatewayOrder, GatewayStatus, RegisterRequest};

use crate::app_config::GatewayConfig;

type HmacSha256 = Hmac<Sha256>;

/// HTTP client for the ZaloPay-style provider. Network calls and request
/// signing only; status interpretation stays in the lifecycle manager.
pub struct ZaloPayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    return_code: i64,
    #[serde(default)]
    return_message: String,
    #[serde(default)]
    order_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryStatusResponse {
    return_code: i64,
    #[serde(default)]
    return_message: String,
}

impl ZaloPayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Check a callback's MAC (HMAC-SHA256 with key2 over the raw data
    /// string) against the value the provider sent.
    pub fn verify_callback(&self, data: &str, mac: &str) -> bool {
        mac_hex(&self.config.key2, data) == mac
    }
}

#[async_trait]
impl GatewayClient for ZaloPayClient {
    async fn register_transaction(
        &self,
        req: &RegisterRequest,
    ) -> Result<GatewayOrder, PaymentError> {
        let app_trans_id = new_app_trans_id();
        let app_time = Utc::now().timestamp_millis();
        let embed_data = serde_json::json!({ "order_ref": req.order_ref }).to_string();
        let item = serde_json::to_string(&req.items).unwrap_or_default();

        // MAC input field order is fixed by the provider.
        let mac_input = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.config.app_id, app_trans_id, req.payer_ref, req.amount, app_time, embed_data, item
        );
        let mac = mac_hex(&self.config.key1, &mac_input);

        let form = [
            ("app_id", self.config.app_id.to_string()),
            ("app_trans_id", app_trans_id.clone()),
            ("app_user", req.payer_ref.clone()),
            ("app_time", app_time.to_string()),
            ("embed_data", embed_data),
            ("item", item),
            ("amount", req.amount.to_string()),
            (
                "description",
                format!("Payment for order #{}", req.order_ref),
            ),
            ("bank_code", req.method.bank_code().to_string()),
            ("callback_url", self.config.callback_url.clone()),
            ("mac", mac),
        ];

        let response = self
            .http
            .post(&self.config.create_url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(http_error(status));
        }

        let body: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(format!("malformed response: {}", e)))?;

        if body.return_code != 1 {
            tracing::warn!(
                %app_trans_id,
                code = body.return_code,
                message = %body.return_message,
                "gateway refused transaction"
            );
            return Err(PaymentError::GatewayRejected(body.return_message));
        }

        let redirect_target = body.order_url.filter(|u| !u.is_empty()).ok_or_else(|| {
            PaymentError::GatewayRejected("gateway returned no order_url".to_string())
        })?;

        tracing::info!(%app_trans_id, order_ref = %req.order_ref, "gateway transaction registered");

        Ok(GatewayOrder {
            intent_id: app_trans_id,
            redirect_target,
        })
    }

    async fn query_status(&self, intent_id: &str) -> Result<GatewayStatus, PaymentError> {
        let mac_input = format!("{}|{}|{}", self.config.app_id, intent_id, self.config.key1);
        let mac = mac_hex(&self.config.key1, &mac_input);

        let form = [
            ("app_id", self.config.app_id.to_string()),
            ("app_trans_id", intent_id.to_string()),
            ("mac", mac),
        ];

        let response = self
            .http
            .post(&self.config.query_url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(http_error(status));
        }

        let body: QueryStatusResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(format!("malformed response: {}", e)))?;

        Ok(GatewayStatus {
            code: body.return_code,
            message: body.return_message,
        })
    }
}

/// `yyMMdd_xxxxxx`, the transaction id format the provider requires
fn new_app_trans_id() -> String {
    let serial: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}_{:06}", Utc::now().format("%y%m%d"), serial)
}

fn mac_hex(key: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn transport_error(e: reqwest::Error) -> PaymentError {
    PaymentError::GatewayUnavailable(e.to_string())
}

fn http_error(status: reqwest::StatusCode) -> PaymentError {
    if status.is_server_error() {
        PaymentError::GatewayUnavailable(format!("gateway answered {}", status))
    } else {
        PaymentError::GatewayRejected(format!("gateway answered {}", status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            app_id: 2553,
            key1: "key-one".to_string(),
            key2: "key-two".to_string(),
            create_url: "https://gateway.test/create".to_string(),
            query_url: "https://gateway.test/query".to_string(),
            callback_url: "https://shop.test/api/payments/callback".to_string(),
        }
    }

    #[test]
    fn app_trans_id_has_provider_format() {
        let id = new_app_trans_id();
        let (date, serial) = id.split_once('_').expect("date and serial parts");
        assert_eq!(date.len(), 6);
        assert!(date.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(serial.len(), 6);
        assert!(serial.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn callback_mac_round_trips_with_key2() {
        let client = ZaloPayClient::new(test_config());
        let data = r#"{"app_trans_id":"250807_000123","zp_trans_id":9000121}"#;

        let mac = mac_hex("key-two", data);
        assert!(client.verify_callback(data, &mac));
    }

    #[test]
    fn callback_mac_rejects_tampered_data() {
        let client = ZaloPayClient::new(test_config());
        let mac = mac_hex("key-two", r#"{"amount":150000}"#);

        assert!(!client.verify_callback(r#"{"amount":999999}"#, &mac));
        assert!(!client.verify_callback(r#"{"amount":150000}"#, "deadbeef"));
    }

    #[test]
    fn signatures_differ_per_key() {
        let payload = "2553|250807_000123|user_7|150000";
        assert_ne!(mac_hex("key-one", payload), mac_hex("key-two", payload));
    }
}
