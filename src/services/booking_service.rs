use sea_orm::{
    ActiveEnum, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::bookings::{BookingList, BookingListQuery, BookingWithTickets},
    entity::{
        bookings::{BookingStatus, Column as BookingCol, Entity as Bookings, Model as BookingModel},
        tickets::{Column as TicketCol, Entity as Tickets},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Booking, Ticket},
    response::ApiResponse,
    state::AppState,
};

pub async fn list_my_bookings(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    let condition = Condition::all().add(BookingCol::UserId.eq(user.user_id));
    list_bookings(state, condition, query).await
}

pub async fn get_my_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<BookingWithTickets>> {
    let booking = Bookings::find_by_id(id)
        .filter(BookingCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;
    with_tickets(state, booking).await
}

/// Shared by the user and admin listings; `condition` scopes the rows.
pub async fn list_bookings(
    state: &AppState,
    mut condition: Condition,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    let (page, limit, offset) = query.pagination().normalize();
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status = BookingStatus::try_from_value(&status.to_string())
            .map_err(|_| AppError::BadRequest(format!("Unknown booking status {status}")))?;
        condition = condition.add(BookingCol::Status.eq(status));
    }

    let finder = Bookings::find()
        .filter(condition)
        .order_by_desc(BookingCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Booking::from)
        .collect();

    Ok(ApiResponse::paged("OK", BookingList { items }, page, limit, total))
}

pub async fn with_tickets(
    state: &AppState,
    booking: BookingModel,
) -> AppResult<ApiResponse<BookingWithTickets>> {
    let tickets = Tickets::find()
        .filter(TicketCol::BookingId.eq(booking.id))
        .order_by_asc(TicketCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Ticket::from)
        .collect();

    Ok(ApiResponse::ok(BookingWithTickets {
        booking: Booking::from(booking),
        tickets,
    }))
}
