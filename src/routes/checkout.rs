use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::checkout::{CheckoutRequest, CheckoutResponse, DemoCheckoutResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_checkout))
        .route("/demo", post(create_checkout_demo))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Payment created, hosted checkout link returned", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty selection, sold out or closed option"),
        (status = 404, description = "Tour or option not found"),
        (status = 500, description = "Payment gateway failure"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = checkout_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/checkout/demo",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Payment created and finalized immediately", body = ApiResponse<DemoCheckoutResponse>),
        (status = 400, description = "Empty selection, sold out or closed option"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout_demo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<DemoCheckoutResponse>>> {
    let resp = checkout_service::checkout_demo(&state, &user, payload).await?;
    Ok(Json(resp))
}
