//! Payment request and response shapes.
//!
//! These are pass-through DTOs. The gateway owns the business rules; the
//! client only guarantees the JSON is well formed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Buyer details attached to a payment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub buyer_name: String,
    pub email: String,
    pub phone: String,
}

/// Body of an `initiate-payment` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Amount in the gateway's currency unit.
    pub amount: f64,

    #[serde(rename = "merchantOrderId")]
    pub merchant_order_id: String,

    pub channel: String,

    pub purpose: String,

    pub customer: Customer,

    /// Seconds the checkout link stays valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl PaymentOrder {
    pub fn new(
        amount: f64,
        merchant_order_id: impl Into<String>,
        channel: impl Into<String>,
        purpose: impl Into<String>,
        customer: Customer,
    ) -> Self {
        Self {
            amount,
            merchant_order_id: merchant_order_id.into(),
            channel: channel.into(),
            purpose: purpose.into(),
            customer,
            expires_in: None,
            metadata: None,
        }
    }

    pub fn with_expires_in(mut self, secs: u64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Response of an `initiate-payment` call.
///
/// Convenience fields are copied out of `raw`; `raw` is the untouched body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentInitiation {
    pub status: Option<String>,
    pub token: Option<String>,
    pub payment_url: Option<String>,
    pub expires_in: Option<i64>,
    pub raw: Value,
}

impl From<Value> for PaymentInitiation {
    fn from(raw: Value) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
        let expires_in = raw.get("expires_in").and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });

        Self {
            status: text("status"),
            token: text("token"),
            payment_url: text("payment_url"),
            expires_in,
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer() -> Customer {
        Customer {
            buyer_name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9999999999".to_string(),
        }
    }

    #[test]
    fn order_serializes_gateway_field_names() {
        let order = PaymentOrder::new(100.0, "ORD1", "web", "test", customer());
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["merchantOrderId"], "ORD1");
        assert_eq!(json["customer"]["buyer_name"], "Asha");
        assert!(json.get("expires_in").is_none());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn order_optional_fields_serialize_when_set() {
        let order = PaymentOrder::new(10.5, "ORD2", "app", "topup", customer())
            .with_expires_in(900)
            .with_metadata("cart", "c-42");
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["expires_in"], 900);
        assert_eq!(json["metadata"]["cart"], "c-42");
    }

    #[test]
    fn initiation_extracts_fields_and_keeps_raw() {
        let raw = json!({
            "status": "pending",
            "token": "pay_x",
            "payment_url": "https://pay.example/pay_x",
            "expires_in": 1800,
            "extra": {"nested": true}
        });
        let initiation = PaymentInitiation::from(raw.clone());

        assert_eq!(initiation.status.as_deref(), Some("pending"));
        assert_eq!(initiation.token.as_deref(), Some("pay_x"));
        assert_eq!(
            initiation.payment_url.as_deref(),
            Some("https://pay.example/pay_x")
        );
        assert_eq!(initiation.expires_in, Some(1800));
        assert_eq!(initiation.raw, raw);
    }

    #[test]
    fn initiation_tolerates_missing_fields() {
        let initiation = PaymentInitiation::from(json!({"message": "queued"}));
        assert!(initiation.token.is_none());
        assert!(initiation.payment_url.is_none());
        assert_eq!(initiation.raw["message"], "queued");
    }
}
