//! Payment gateway seam. The process entry point builds one client and hands
//! it to the checkout and webhook services through `AppState`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod payos;
pub mod signature;

pub use payos::PayOsClient;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentLinkItem {
    pub name: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct PaymentLinkRequest {
    pub order_code: i64,
    pub amount: i64,
    pub description: String,
    pub return_url: String,
    pub cancel_url: String,
    pub items: Vec<PaymentLinkItem>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentLink {
    pub checkout_url: Option<String>,
    pub qr_code: Option<String>,
}

/// Inbound payment-status notification as the gateway posts it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentNotification {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl PaymentNotification {
    /// Order code as stored in `payments.intent_id`.
    pub fn order_code(&self) -> Option<String> {
        match self.data.get("orderCode")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

/// How a notification affects the payment it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    Paid,
    Failed,
    Neutral,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name stored on payment records.
    fn provider(&self) -> &'static str;

    async fn create_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> anyhow::Result<PaymentLink>;

    /// True when `signature` authenticates the notification's `data`.
    fn verify_notification(&self, notification: &PaymentNotification, signature: &str) -> bool;

    fn classify(&self, notification: &PaymentNotification) -> NotificationOutcome;

    /// Connectivity probes are acknowledged without a signature.
    fn is_ping(&self, notification: &PaymentNotification) -> bool;
}
