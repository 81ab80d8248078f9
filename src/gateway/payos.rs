use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{
    NotificationOutcome, PaymentGateway, PaymentLink, PaymentLinkItem, PaymentLinkRequest,
    PaymentNotification, signature,
};
use crate::config::PayOsConfig;

pub const PROVIDER: &str = "payos";

/// Order code payOS uses for the "test webhook URL" probe.
pub const PING_ORDER_CODE: &str = "123";

const SUCCESS_CODE: &str = "00";

pub struct PayOsClient {
    http: reqwest::Client,
    config: PayOsConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentBody<'a> {
    order_code: i64,
    amount: i64,
    description: &'a str,
    cancel_url: &'a str,
    return_url: &'a str,
    items: &'a [PaymentLinkItem],
    signature: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    code: String,
    desc: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedLink {
    checkout_url: Option<String>,
    qr_code: Option<String>,
}

impl PayOsClient {
    pub fn new(config: PayOsConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building payOS http client")?;
        Ok(Self { http, config })
    }

    fn request_signature(&self, request: &PaymentLinkRequest) -> anyhow::Result<String> {
        let fields = json!({
            "amount": request.amount,
            "cancelUrl": request.cancel_url,
            "description": request.description,
            "orderCode": request.order_code,
            "returnUrl": request.return_url,
        });
        let Value::Object(map) = fields else {
            bail!("signature fields must form an object");
        };
        signature::sign(&self.config.checksum_key, &map)
    }
}

#[async_trait]
impl PaymentGateway for PayOsClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn create_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> anyhow::Result<PaymentLink> {
        let body = CreatePaymentBody {
            order_code: request.order_code,
            amount: request.amount,
            description: &request.description,
            cancel_url: &request.cancel_url,
            return_url: &request.return_url,
            items: &request.items,
            signature: self.request_signature(request)?,
        };

        let url = format!(
            "{}/v2/payment-requests",
            self.config.base_url.trim_end_matches('/')
        );
        let envelope: Envelope<CreatedLink> = self
            .http
            .post(url)
            .header("x-client-id", &self.config.client_id)
            .header("x-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("calling payOS")?
            .error_for_status()
            .context("payOS returned an error status")?
            .json()
            .await
            .context("decoding payOS response")?;

        if envelope.code != SUCCESS_CODE {
            bail!(
                "payOS rejected order {}: {} {}",
                request.order_code,
                envelope.code,
                envelope.desc.unwrap_or_default()
            );
        }
        let link = envelope
            .data
            .context("payOS response carried no payment link")?;
        Ok(PaymentLink {
            checkout_url: link.checkout_url,
            qr_code: link.qr_code,
        })
    }

    fn verify_notification(&self, notification: &PaymentNotification, signature: &str) -> bool {
        signature::verify(&self.config.checksum_key, &notification.data, signature)
    }

    fn classify(&self, notification: &PaymentNotification) -> NotificationOutcome {
        classify(notification)
    }

    fn is_ping(&self, notification: &PaymentNotification) -> bool {
        is_ping(notification)
    }
}

pub fn is_ping(notification: &PaymentNotification) -> bool {
    notification.order_code().as_deref() == Some(PING_ORDER_CODE)
}

/// Maps payOS codes and statuses onto paid / failed / neutral.
///
/// An explicit `status` wins. Without one, the `data.code` (falling back to the
/// top-level `code`) decides: `00` is paid, any other code is a failure.
pub fn classify(notification: &PaymentNotification) -> NotificationOutcome {
    let status = field_str(&notification.data, "status");
    if let Some(status) = status {
        return match status.to_ascii_uppercase().as_str() {
            "PAID" | "SUCCEEDED" | "SUCCESS" => NotificationOutcome::Paid,
            "CANCELLED" | "CANCELED" | "FAILED" | "EXPIRED" => NotificationOutcome::Failed,
            _ => NotificationOutcome::Neutral,
        };
    }

    let code = field_str(&notification.data, "code").or(notification.code.clone());
    match code.as_deref() {
        Some(SUCCESS_CODE) if notification.success != Some(false) => NotificationOutcome::Paid,
        Some(SUCCESS_CODE) => NotificationOutcome::Neutral,
        Some(_) => NotificationOutcome::Failed,
        None => NotificationOutcome::Neutral,
    }
}

fn field_str(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(body: Value) -> PaymentNotification {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn explicit_status_drives_classification() {
        let paid = notification(json!({ "data": { "orderCode": 1, "status": "paid" } }));
        let cancelled = notification(json!({ "data": { "orderCode": 1, "status": "CANCELLED" } }));
        let pending = notification(json!({ "data": { "orderCode": 1, "status": "PENDING" } }));
        assert_eq!(classify(&paid), NotificationOutcome::Paid);
        assert_eq!(classify(&cancelled), NotificationOutcome::Failed);
        assert_eq!(classify(&pending), NotificationOutcome::Neutral);
    }

    #[test]
    fn code_is_used_when_status_is_absent() {
        let paid = notification(json!({
            "code": "00", "success": true, "data": { "orderCode": 1, "code": "00" }
        }));
        let failed = notification(json!({ "code": "01", "data": { "orderCode": 1 } }));
        let empty = notification(json!({ "data": { "orderCode": 1 } }));
        assert_eq!(classify(&paid), NotificationOutcome::Paid);
        assert_eq!(classify(&failed), NotificationOutcome::Failed);
        assert_eq!(classify(&empty), NotificationOutcome::Neutral);
    }

    #[test]
    fn ping_is_recognised_by_order_code() {
        assert!(is_ping(&notification(json!({ "data": { "orderCode": 123 } }))));
        assert!(is_ping(&notification(json!({ "data": { "orderCode": "123" } }))));
        assert!(!is_ping(&notification(json!({ "data": { "orderCode": 1234 } }))));
    }
}
