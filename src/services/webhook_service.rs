//! Inbound payment notifications.
//!
//! Everything past the signature check is acknowledged with 200, including
//! finalize failures: an error reply would make the gateway redeliver
//! indefinitely. Stuck payments stay in `processing` for operators.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::Value;

use crate::{
    dto::checkout::WebhookAck,
    entity::payments::{Column as PaymentCol, Entity as Payments},
    error::{AppError, AppResult},
    gateway::{NotificationOutcome, PaymentNotification},
    response::ApiResponse,
    services::finalize_service,
    state::AppState,
};

/// Entry point for the raw request body; anything that is not JSON is a BadRequest.
pub async fn handle_payload(
    state: &AppState,
    header_signature: Option<&str>,
    raw: &[u8],
) -> AppResult<ApiResponse<WebhookAck>> {
    let body: Value = serde_json::from_slice(raw)
        .map_err(|_| AppError::BadRequest("Malformed notification".into()))?;
    handle_notification(state, header_signature, body).await
}

pub async fn handle_notification(
    state: &AppState,
    header_signature: Option<&str>,
    body: Value,
) -> AppResult<ApiResponse<WebhookAck>> {
    let notification: PaymentNotification = serde_json::from_value(body.clone())
        .map_err(|_| AppError::BadRequest("Malformed notification".into()))?;

    if state.gateway.is_ping(&notification) {
        tracing::info!("payment webhook ping acknowledged");
        return Ok(ack("Ping received"));
    }

    if !is_authentic(state, &notification, header_signature) {
        tracing::warn!(
            order_code = ?notification.order_code(),
            "payment webhook rejected: invalid signature"
        );
        return Err(AppError::BadRequest("Invalid signature".into()));
    }

    let Some(order_code) = notification.order_code() else {
        tracing::warn!("signed payment webhook without an order code");
        return Ok(ack("Ignored"));
    };

    let payment = Payments::find()
        .filter(PaymentCol::IntentId.eq(order_code.as_str()))
        .filter(PaymentCol::Provider.eq(state.gateway.provider()))
        .one(&state.orm)
        .await?;
    let Some(payment) = payment else {
        tracing::info!(%order_code, "payment webhook for unknown order");
        return Ok(ack("Unknown order"));
    };

    match state.gateway.classify(&notification) {
        NotificationOutcome::Paid => {
            if !finalize_service::begin_processing(&state.orm, &payment, Some(body)).await? {
                tracing::info!(%order_code, "payment already succeeded, duplicate delivery");
                return Ok(ack("Already processed"));
            }
            if let Err(err) = finalize_service::finalize(&state.orm, payment.id).await {
                tracing::error!(
                    error = %err,
                    payment_id = %payment.id,
                    %order_code,
                    "finalize failed, payment left in processing"
                );
            }
        }
        NotificationOutcome::Failed => {
            finalize_service::mark_failed(&state.orm, &payment, Some(body)).await?;
        }
        NotificationOutcome::Neutral => {
            tracing::debug!(%order_code, "payment webhook with neutral status");
        }
    }

    Ok(ack("OK"))
}

/// Accepts the body `signature` field or the `x-signature` header.
fn is_authentic(
    state: &AppState,
    notification: &PaymentNotification,
    header_signature: Option<&str>,
) -> bool {
    [notification.signature.as_deref(), header_signature]
        .into_iter()
        .flatten()
        .filter(|sig| !sig.is_empty())
        .any(|sig| state.gateway.verify_notification(notification, sig))
}

fn ack(message: &str) -> ApiResponse<WebhookAck> {
    ApiResponse::success(message, WebhookAck { ok: true }, None)
}
