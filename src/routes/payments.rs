use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::payments::PaymentList,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    routes::params::Pagination,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_payments))
        .route("/{id}", get(get_my_payment))
}

#[utoipa::path(
    get,
    path = "/api/payments",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses((status = 200, description = "Current user's payments, newest first", body = ApiResponse<PaymentList>)),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_my_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<PaymentList>>> {
    let resp = payment_service::list_my_payments(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_my_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::get_my_payment(&state, &user, id).await?;
    Ok(Json(resp))
}
