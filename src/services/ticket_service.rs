use sea_orm::{
    ActiveEnum, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::{
    dto::tickets::{TicketList, TicketQuery, TicketWithBooking},
    entity::{
        bookings::{Column as BookingCol, Entity as Bookings},
        tickets::{self, Column as TicketCol, Entity as Tickets, TicketStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Booking, Ticket},
    response::ApiResponse,
    state::AppState,
};

/// Tickets belonging to the caller's bookings.
pub async fn list_my_tickets(
    state: &AppState,
    user: &AuthUser,
    query: TicketQuery,
) -> AppResult<ApiResponse<TicketList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(BookingCol::UserId.eq(user.user_id));

    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status = TicketStatus::try_from_value(&status.to_string())
            .map_err(|_| AppError::BadRequest(format!("Unknown ticket status {status}")))?;
        condition = condition.add(TicketCol::Status.eq(status));
    }
    if let Some(booking_id) = query.booking_id {
        condition = condition.add(TicketCol::BookingId.eq(booking_id));
    }
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q.to_lowercase());
        let mut any = Condition::any();
        for col in [TicketCol::Code, TicketCol::PassengerName, TicketCol::PassengerPhone] {
            any = any.add(
                Expr::expr(Func::lower(Expr::col((tickets::Entity, col)))).like(pattern.clone()),
            );
        }
        condition = condition.add(any);
    }

    let finder = Tickets::find()
        .join(JoinType::InnerJoin, tickets::Relation::Bookings.def())
        .filter(condition)
        .order_by_desc(TicketCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Ticket::from)
        .collect();

    Ok(ApiResponse::paged("OK", TicketList { items }, page, limit, total))
}

pub async fn get_my_ticket(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<TicketWithBooking>> {
    let ticket = Tickets::find_by_id(id).one(&state.orm).await?;
    owned_ticket(state, user, ticket).await
}

pub async fn get_my_ticket_by_code(
    state: &AppState,
    user: &AuthUser,
    code: &str,
) -> AppResult<ApiResponse<TicketWithBooking>> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("Invalid code".into()));
    }
    let ticket = Tickets::find()
        .filter(TicketCol::Code.eq(code))
        .one(&state.orm)
        .await?;
    owned_ticket(state, user, ticket).await
}

/// Someone else's ticket reads as not found.
async fn owned_ticket(
    state: &AppState,
    user: &AuthUser,
    ticket: Option<tickets::Model>,
) -> AppResult<ApiResponse<TicketWithBooking>> {
    let ticket = ticket.ok_or_else(|| AppError::not_found("Ticket"))?;
    let booking = Bookings::find_by_id(ticket.booking_id)
        .one(&state.orm)
        .await?
        .filter(|b| b.user_id == user.user_id)
        .ok_or_else(|| AppError::not_found("Ticket"))?;

    Ok(ApiResponse::ok(TicketWithBooking {
        ticket: Ticket::from(ticket),
        booking: Booking::from(booking),
    }))
}
