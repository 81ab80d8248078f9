use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::bookings::{BookingList, BookingListQuery, BookingWithTickets},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::booking_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_bookings))
        .route("/{id}", get(get_my_booking))
}

#[utoipa::path(
    get,
    path = "/api/bookings",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending, confirmed, cancelled, completed")
    ),
    responses((status = 200, description = "Current user's bookings", body = ApiResponse<BookingList>)),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn list_my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<BookingList>>> {
    let resp = booking_service::list_my_bookings(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking with its tickets", body = ApiResponse<BookingWithTickets>),
        (status = 404, description = "Booking not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn get_my_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingWithTickets>>> {
    let resp = booking_service::get_my_booking(&state, &user, id).await?;
    Ok(Json(resp))
}
