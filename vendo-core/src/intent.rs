use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PaymentError;

/// Payment intent status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Created,
    Pending,
    Succeeded,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded | PaymentStatus::Failed | PaymentStatus::Expired
        )
    }

    /// Forward-only transition check. Terminal states accept nothing;
    /// CREATED may only start processing; PENDING may resolve or expire.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        match self {
            PaymentStatus::Created => matches!(next, PaymentStatus::Pending),
            PaymentStatus::Pending => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "CREATED",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported payment channels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Qr,
    App,
    Web,
}

impl PaymentMethod {
    /// Channel code the gateway expects in `bank_code`. An empty code sends
    /// the payer to the provider's hosted web checkout.
    pub fn bank_code(&self) -> &'static str {
        match self {
            PaymentMethod::Qr => "QR",
            PaymentMethod::App => "zalopayapp",
            PaymentMethod::Web => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Qr => "QR",
            PaymentMethod::App => "APP",
            PaymentMethod::Web => "WEB",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QR" => Ok(PaymentMethod::Qr),
            "APP" => Ok(PaymentMethod::App),
            "WEB" => Ok(PaymentMethod::Web),
            other => Err(PaymentError::UnsupportedMethod(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cart line as submitted by the checkout flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: i64,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

/// Sum of all line totals
pub fn cart_total(items: &[CartItem]) -> i64 {
    items.iter().map(CartItem::line_total).sum()
}

/// A single attempt to pay for one order via one method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider-assigned transaction id, assigned exactly once at creation
    pub intent_id: String,
    pub order_ref: Uuid,
    pub method: PaymentMethod,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    /// URL to navigate to, or the encoded payload to render as a QR code
    pub redirect_target: String,
    pub provider_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn new(
        intent_id: String,
        order_ref: Uuid,
        method: PaymentMethod,
        amount: i64,
        currency: String,
        redirect_target: String,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            intent_id,
            order_ref,
            method,
            amount,
            currency,
            status: PaymentStatus::Created,
            redirect_target,
            provider_message: None,
            created_at: now,
            last_checked_at: None,
            expires_at: now + ttl,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_accept_no_transition() {
        for terminal in [
            PaymentStatus::Succeeded,
            PaymentStatus::Failed,
            PaymentStatus::Expired,
        ] {
            for next in [
                PaymentStatus::Created,
                PaymentStatus::Pending,
                PaymentStatus::Succeeded,
                PaymentStatus::Failed,
                PaymentStatus::Expired,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn pending_resolves_forward_only() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Succeeded));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Expired));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Created));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn method_parses_from_wire_form() {
        assert_eq!("QR".parse::<PaymentMethod>().unwrap(), PaymentMethod::Qr);
        assert_eq!("APP".parse::<PaymentMethod>().unwrap(), PaymentMethod::App);
        assert_eq!("WEB".parse::<PaymentMethod>().unwrap(), PaymentMethod::Web);
        assert!("CASH".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn cart_total_sums_line_totals() {
        let items = vec![
            CartItem {
                product_id: Uuid::new_v4(),
                name: "Banh mi".to_string(),
                unit_price: 25000,
                quantity: 2,
            },
            CartItem {
                product_id: Uuid::new_v4(),
                name: "Ca phe sua".to_string(),
                unit_price: 100000,
                quantity: 1,
            },
        ];
        assert_eq!(cart_total(&items), 150000);
    }
}
