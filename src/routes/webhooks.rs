use axum::{Json, Router, body::Bytes, extract::State, http::HeaderMap, routing::get};

use crate::{
    dto::checkout::WebhookAck,
    error::AppResult,
    response::ApiResponse,
    services::webhook_service,
    state::AppState,
};

const SIGNATURE_HEADER: &str = "x-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/payment", get(probe).post(payment_webhook))
}

#[utoipa::path(
    get,
    path = "/api/webhooks/payment",
    responses((status = 200, description = "Webhook URL is reachable", body = ApiResponse<WebhookAck>)),
    tag = "Webhooks"
)]
pub async fn probe() -> Json<ApiResponse<WebhookAck>> {
    Json(ApiResponse::ok(WebhookAck { ok: true }))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/payment",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Notification acknowledged", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Invalid signature"),
    ),
    tag = "Webhooks"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let resp = webhook_service::handle_payload(&state, signature, &body).await?;
    Ok(Json(resp))
}
