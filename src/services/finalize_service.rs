//! Turns a paid payment into bookings and tickets.
//!
//! Payment status moves are conditional updates guarded by
//! `status != succeeded`, so replayed notifications cannot finalize twice.
//! Each line commits in its own transaction (seats, booking, tickets, cart
//! cleanup) but nothing spans the whole payment: a failure halfway leaves the
//! payment in `processing` with earlier lines committed. A later run skips
//! lines that already produced a booking. Two runs racing on the same line
//! both take seats, and the loser's booking insert hits the
//! `(payment_id, cart_item_id)` unique index, rolling its seats back.

use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    Set, SqlErr, TransactionTrait,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    db::OrmConn,
    entity::{
        bookings::{
            ActiveModel as BookingActive, BookingPaymentStatus, BookingStatus,
            Column as BookingCol, Entity as Bookings, Model as BookingModel,
        },
        cart_items::{Column as CartCol, Entity as CartItems},
        payments::{
            ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments,
            Model as PaymentModel, PaymentLine, PaymentPayload, PaymentStatus,
        },
        tickets::{ActiveModel as TicketActive, Model as TicketModel, TicketStatus},
        tour_options::Entity as TourOptions,
        tours::Entity as Tours,
    },
    error::{AppError, AppResult},
    services::inventory_service,
};

const TICKET_CODE_ATTEMPTS: usize = 5;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Default)]
pub struct FinalizeOutcome {
    pub bookings: Vec<BookingModel>,
    pub tickets_issued: usize,
    /// Lines already booked by an earlier, interrupted run.
    pub skipped_lines: usize,
    /// True when the payment had already succeeded and nothing was done.
    pub already_finalized: bool,
}

/// Moves a payment into `processing`, recording the raw callback.
///
/// Returns `false` when the payment has already succeeded.
pub async fn begin_processing(
    conn: &OrmConn,
    payment: &PaymentModel,
    callback: Option<Value>,
) -> AppResult<bool> {
    transition(conn, payment, PaymentStatus::Processing, callback).await
}

/// Marks a payment `failed` unless it has already succeeded.
pub async fn mark_failed(
    conn: &OrmConn,
    payment: &PaymentModel,
    callback: Option<Value>,
) -> AppResult<bool> {
    transition(conn, payment, PaymentStatus::Failed, callback).await
}

async fn transition(
    conn: &OrmConn,
    payment: &PaymentModel,
    status: PaymentStatus,
    callback: Option<Value>,
) -> AppResult<bool> {
    let mut active = PaymentActive {
        status: Set(status),
        updated_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    if let Some(callback) = callback {
        active.payload = Set(PaymentPayload {
            items: payment.payload.items.clone(),
            callback: Some(callback),
        });
    }

    let result = Payments::update_many()
        .set(active)
        .filter(PaymentCol::Id.eq(payment.id))
        .filter(PaymentCol::Status.ne(PaymentStatus::Succeeded))
        .exec(conn)
        .await?;

    let applied = result.rows_affected == 1;
    tracing::info!(
        payment_id = %payment.id,
        order_code = %payment.intent_id,
        to = ?status,
        applied,
        "payment status transition"
    );
    Ok(applied)
}

/// Commits inventory and issues bookings and tickets for every purchased line.
pub async fn finalize(conn: &OrmConn, payment_id: Uuid) -> AppResult<FinalizeOutcome> {
    let payment = Payments::find_by_id(payment_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    match payment.status {
        PaymentStatus::Succeeded => {
            tracing::info!(%payment_id, "payment already finalized");
            return Ok(FinalizeOutcome {
                already_finalized: true,
                ..Default::default()
            });
        }
        PaymentStatus::Processing => {}
        other => {
            return Err(AppError::BadRequest(format!(
                "Payment is {other:?}, expected Processing"
            )));
        }
    }

    let mut outcome = FinalizeOutcome::default();
    for line in &payment.payload.items {
        let already_booked = Bookings::find()
            .filter(BookingCol::PaymentId.eq(payment.id))
            .filter(BookingCol::CartItemId.eq(line.cart_item_id))
            .one(conn)
            .await?;
        if already_booked.is_some() {
            tracing::warn!(
                %payment_id,
                cart_item_id = %line.cart_item_id,
                "line already booked by an earlier run, skipping"
            );
            outcome.skipped_lines += 1;
            remove_cart_line(conn, payment.user_id, line.cart_item_id).await?;
            continue;
        }

        match finalize_line(conn, &payment, line).await? {
            Some((booking, tickets)) => {
                outcome.tickets_issued += tickets.len();
                outcome.bookings.push(booking);
            }
            None => outcome.skipped_lines += 1,
        }
    }

    let completed = Payments::update_many()
        .set(PaymentActive {
            status: Set(PaymentStatus::Succeeded),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        })
        .filter(PaymentCol::Id.eq(payment.id))
        .filter(PaymentCol::Status.ne(PaymentStatus::Succeeded))
        .exec(conn)
        .await?;
    if completed.rows_affected == 0 {
        tracing::warn!(%payment_id, "payment succeeded concurrently");
    }

    tracing::info!(
        %payment_id,
        order_code = %payment.intent_id,
        bookings = outcome.bookings.len(),
        tickets = outcome.tickets_issued,
        skipped = outcome.skipped_lines,
        "payment finalized"
    );
    audit::record(
        conn,
        Some(payment.user_id),
        "payment_finalized",
        "payments",
        serde_json::json!({
            "payment_id": payment.id,
            "order_code": payment.intent_id,
            "bookings": outcome.bookings.iter().map(|b| b.id).collect::<Vec<_>>(),
        }),
    )
    .await;

    Ok(outcome)
}

/// Books one line atomically. `None` means a concurrent run booked it first.
async fn finalize_line(
    conn: &OrmConn,
    payment: &PaymentModel,
    line: &PaymentLine,
) -> AppResult<Option<(BookingModel, Vec<TicketModel>)>> {
    let tour = Tours::find_by_id(line.tour_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Tour"))?;
    let option = TourOptions::find_by_id(line.option_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Tour option"))?;

    let txn = conn.begin().await?;
    if !inventory_service::reserve(&txn, option.id, line.quantity).await? {
        txn.rollback().await?;
        tracing::error!(
            payment_id = %payment.id,
            option_id = %option.id,
            quantity = line.quantity,
            "seats gone before finalize, payment needs reconciliation"
        );
        return Err(AppError::BadRequest(format!(
            "Option {} no longer has {} seats",
            option.id, line.quantity
        )));
    }

    let now = Utc::now().fixed_offset();
    let inserted = BookingActive {
        id: Set(Uuid::new_v4()),
        payment_id: Set(payment.id),
        cart_item_id: Set(line.cart_item_id),
        user_id: Set(payment.user_id),
        tour_id: Set(tour.id),
        option_id: Set(option.id),
        start_date: Set(option.start_date),
        start_time: Set(option.start_time.clone()),
        quantity: Set(line.quantity),
        unit_price: Set(line.unit_price),
        total: Set(line.total()),
        status: Set(BookingStatus::Confirmed),
        payment_status: Set(BookingPaymentStatus::Paid),
        snapshot_title: Set(line.title.clone()),
        snapshot_destination: Set(line.destination.clone()),
        contact_name: Set(line.contact.name.clone()),
        contact_phone: Set(line.contact.phone.clone()),
        note: Set(line.contact.note.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await;
    let booking = match inserted {
        Ok(booking) => booking,
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            txn.rollback().await?;
            tracing::warn!(
                payment_id = %payment.id,
                cart_item_id = %line.cart_item_id,
                "line booked by a concurrent run, seats rolled back"
            );
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let mut tickets = Vec::with_capacity(usize::try_from(line.quantity).unwrap_or_default());
    for _ in 0..line.quantity {
        tickets.push(issue_ticket(&txn, &booking, line).await?);
    }

    remove_cart_line(&txn, payment.user_id, line.cart_item_id).await?;
    txn.commit().await?;

    Ok(Some((booking, tickets)))
}

/// Inserts one ticket, drawing a fresh code when the unique index rejects one.
///
/// Each attempt runs under a savepoint so a rejected code does not abort `txn`.
async fn issue_ticket(
    txn: &DatabaseTransaction,
    booking: &BookingModel,
    line: &PaymentLine,
) -> AppResult<TicketModel> {
    let mut last_err = None;
    for _ in 0..TICKET_CODE_ATTEMPTS {
        let code = ticket_code(&line.title);
        let attempt = txn.begin().await?;
        let inserted = TicketActive {
            id: Set(Uuid::new_v4()),
            booking_id: Set(booking.id),
            qr_payload: Set(qr_payload(&code, booking)),
            code: Set(code),
            status: Set(TicketStatus::Valid),
            passenger_name: Set(line.contact.name.clone()),
            passenger_phone: Set(line.contact.phone.clone()),
            passenger_address: Set(line.contact.address.clone()),
            used_at: Set(None),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&attempt)
        .await;

        match inserted {
            Ok(ticket) => {
                attempt.commit().await?;
                return Ok(ticket);
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                attempt.rollback().await?;
                tracing::debug!(booking_id = %booking.id, "ticket code collision, retrying");
                last_err = Some(err);
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not draw a unique ticket code for booking {}: {:?}",
        booking.id,
        last_err
    )))
}

async fn remove_cart_line<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    cart_item_id: Uuid,
) -> AppResult<()> {
    CartItems::delete_many()
        .filter(CartCol::Id.eq(cart_item_id))
        .filter(CartCol::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// `SLUG-XXXXXX`: up to six letters or digits from the title, then a random suffix.
pub fn ticket_code(title: &str) -> String {
    let mut slug: String = title
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(6)
        .collect();
    if slug.is_empty() {
        slug.push_str("TOUR");
    }

    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect();
    format!("{slug}-{suffix}")
}

fn qr_payload(code: &str, booking: &BookingModel) -> String {
    serde_json::json!({
        "code": code,
        "booking_id": booking.id,
        "option_id": booking.option_id,
    })
    .to_string()
}
