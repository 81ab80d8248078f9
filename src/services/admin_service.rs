use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::bookings::{BookingList, BookingListQuery, BookingWithTickets},
    entity::{
        bookings::{
            ActiveModel as BookingActive, BookingPaymentStatus, BookingStatus,
            Column as BookingCol, Entity as Bookings,
        },
        tickets::{Column as TicketCol, Entity as Tickets, TicketStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::ApiResponse,
    services::{booking_service, inventory_service},
    state::AppState,
};

pub async fn list_bookings(
    state: &AppState,
    user: &AuthUser,
    query: BookingListQuery,
) -> AppResult<ApiResponse<BookingList>> {
    ensure_admin(user)?;
    booking_service::list_bookings(state, Condition::all(), query).await
}

pub async fn get_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<BookingWithTickets>> {
    ensure_admin(user)?;
    let booking = Bookings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;
    booking_service::with_tickets(state, booking).await
}

/// Cancels a booking, voids its valid tickets and gives the seats back in one
/// transaction; a failed step leaves the booking untouched and retryable.
pub async fn cancel_booking(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<BookingWithTickets>> {
    ensure_admin(user)?;
    let booking = Bookings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;

    let txn = state.orm.begin().await?;
    let cancelled = Bookings::update_many()
        .set(BookingActive {
            status: Set(BookingStatus::Cancelled),
            payment_status: Set(BookingPaymentStatus::Refunded),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        })
        .filter(BookingCol::Id.eq(booking.id))
        .filter(BookingCol::Status.ne(BookingStatus::Cancelled))
        .exec(&txn)
        .await?;
    if cancelled.rows_affected == 0 {
        txn.rollback().await?;
        return Err(AppError::BadRequest("Booking already cancelled".into()));
    }

    let voided = Tickets::update_many()
        .col_expr(TicketCol::Status, Expr::value(TicketStatus::Void))
        .filter(TicketCol::BookingId.eq(booking.id))
        .filter(TicketCol::Status.eq(TicketStatus::Valid))
        .exec(&txn)
        .await?;

    let released = inventory_service::release(&txn, booking.option_id, booking.quantity).await?;
    if !released {
        tracing::warn!(
            booking_id = %booking.id,
            option_id = %booking.option_id,
            "seat release did not apply, capacity needs reconciliation"
        );
    }
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "booking_cancel",
        "bookings",
        serde_json::json!({
            "booking_id": booking.id,
            "tickets_voided": voided.rows_affected,
            "seats_released": released,
        }),
    )
    .await;

    let booking = Bookings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Booking"))?;
    booking_service::with_tickets(state, booking).await
}
