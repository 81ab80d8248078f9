use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::tickets::{TicketList, TicketQuery, TicketWithBooking},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::ticket_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_my_tickets))
        .route("/code/{code}", get(get_my_ticket_by_code))
        .route("/{id}", get(get_my_ticket))
}

#[utoipa::path(
    get,
    path = "/api/tickets",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "valid, used, refunded, void"),
        ("booking_id" = Option<Uuid>, Query, description = "Only tickets of this booking"),
        ("q" = Option<String>, Query, description = "Search code, passenger name or phone")
    ),
    responses((status = 200, description = "Current user's tickets", body = ApiResponse<TicketList>)),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn list_my_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TicketQuery>,
) -> AppResult<Json<ApiResponse<TicketList>>> {
    let resp = ticket_service::list_my_tickets(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket with its booking", body = ApiResponse<TicketWithBooking>),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn get_my_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TicketWithBooking>>> {
    let resp = ticket_service::get_my_ticket(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tickets/code/{code}",
    params(("code" = String, Path, description = "Ticket code")),
    responses(
        (status = 200, description = "Ticket with its booking", body = ApiResponse<TicketWithBooking>),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn get_my_ticket_by_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<TicketWithBooking>>> {
    let resp = ticket_service::get_my_ticket_by_code(&state, &user, &code).await?;
    Ok(Json(resp))
}
