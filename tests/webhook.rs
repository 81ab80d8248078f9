mod common;

use common::{
    add_to_cart, checkout_request, paid_data, reload_option, reload_payment, seed_option,
    seed_tour, setup_state, signed_notification, user,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use tour_booking_api::{
    entity::{Bookings, bookings, payments::PaymentStatus},
    error::AppError,
    gateway::signature,
    services::{checkout_service, webhook_service},
    state::AppState,
};

/// Creates a payment for one seat and returns `(payment_id, order_code)`.
async fn pending_payment(state: &AppState) -> anyhow::Result<(uuid::Uuid, String)> {
    let buyer = user();
    let tour = seed_tour(state, "Ba Na Hills", 100).await?;
    let option = seed_option(state, tour.id, 5, 30).await?;
    let line_id = add_to_cart(state, &buyer, &option, 1).await?;
    let resp = checkout_service::checkout(state, &buyer, checkout_request(vec![line_id])).await?;
    let checkout = resp.data.expect("checkout data");
    Ok((checkout.payment_id, checkout.order_code))
}

#[tokio::test]
async fn ping_is_acknowledged_without_signature() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let body = json!({ "code": "00", "desc": "success", "data": { "orderCode": 123 } });

    let ack = webhook_service::handle_notification(&state, None, body).await?;
    assert_eq!(ack.message, "Ping received");
    assert!(ack.data.expect("ack").ok);
    Ok(())
}

#[tokio::test]
async fn unsigned_or_tampered_notifications_are_rejected() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let (payment_id, order_code) = pending_payment(&state).await?;

    let unsigned = json!({ "code": "00", "data": paid_data(&order_code, 100) });
    let err = webhook_service::handle_notification(&state, None, unsigned)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let mut tampered = signed_notification(paid_data(&order_code, 100));
    tampered["data"]["amount"] = json!(1);
    let err = webhook_service::handle_notification(&state, None, tampered)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = webhook_service::handle_notification(&state, None, json!("not an object"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    assert_eq!(
        reload_payment(&state, payment_id).await?.status,
        PaymentStatus::Created
    );
    assert_eq!(Bookings::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn header_signature_is_accepted() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let (payment_id, order_code) = pending_payment(&state).await?;

    let data = paid_data(&order_code, 100);
    let sig = signature::sign(common::CHECKSUM_KEY, data.as_object().expect("object"))?;
    let body = json!({ "code": "00", "desc": "success", "data": data });

    webhook_service::handle_notification(&state, Some(&sig), body).await?;
    assert_eq!(
        reload_payment(&state, payment_id).await?.status,
        PaymentStatus::Succeeded
    );
    Ok(())
}

#[tokio::test]
async fn unknown_order_is_acknowledged() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let body = signed_notification(paid_data("987654321", 100));

    let ack = webhook_service::handle_notification(&state, None, body).await?;
    assert_eq!(ack.message, "Unknown order");
    Ok(())
}

#[tokio::test]
async fn cancelled_payment_is_marked_failed() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let (payment_id, order_code) = pending_payment(&state).await?;

    let data = json!({
        "orderCode": order_code.parse::<i64>()?,
        "amount": 100,
        "status": "CANCELLED",
    });
    webhook_service::handle_notification(&state, None, signed_notification(data)).await?;

    let payment = reload_payment(&state, payment_id).await?;
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.payload.callback.is_some());
    assert_eq!(Bookings::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn late_failure_does_not_undo_success() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let (payment_id, order_code) = pending_payment(&state).await?;

    webhook_service::handle_notification(
        &state,
        None,
        signed_notification(paid_data(&order_code, 100)),
    )
    .await?;

    let data = json!({ "orderCode": order_code.parse::<i64>()?, "code": "01", "desc": "expired" });
    webhook_service::handle_notification(&state, None, signed_notification(data)).await?;

    assert_eq!(
        reload_payment(&state, payment_id).await?.status,
        PaymentStatus::Succeeded
    );
    assert_eq!(Bookings::find().count(&state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn finalize_failure_is_acknowledged_and_left_processing() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Phu Quoc Snorkel", 100).await?;
    let option = seed_option(&state, tour.id, 2, 30).await?;
    let line_id = add_to_cart(&state, &buyer, &option, 2).await?;
    let checkout = checkout_service::checkout(&state, &buyer, checkout_request(vec![line_id]))
        .await?
        .data
        .expect("checkout data");

    // Another buyer finalized first and took the last seats.
    common::set_capacity_sold(&state, option.id, 2).await?;

    let ack = webhook_service::handle_notification(
        &state,
        None,
        signed_notification(paid_data(&checkout.order_code, 200)),
    )
    .await?;
    assert!(ack.data.expect("ack").ok);

    assert_eq!(
        reload_payment(&state, checkout.payment_id).await?.status,
        PaymentStatus::Processing
    );
    assert_eq!(Bookings::find().count(&state.orm).await?, 0);
    assert_eq!(reload_option(&state, option.id).await?.capacity_sold, 2);
    Ok(())
}

#[tokio::test]
async fn raw_body_must_be_json() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;

    let err = webhook_service::handle_payload(&state, None, b"orderCode=1&status=PAID")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let ping = br#"{"code":"00","data":{"orderCode":123}}"#;
    let ack = webhook_service::handle_payload(&state, None, ping).await?;
    assert_eq!(ack.message, "Ping received");
    Ok(())
}

// Gateways redeliver; two copies of the same paid notification may land together.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_duplicate_deliveries_book_seats_once() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;

    for round in 0..10 {
        let buyer = user();
        let tour = seed_tour(&state, &format!("Hai Van Pass {round}"), 100).await?;
        let option = seed_option(&state, tour.id, 10, 30).await?;
        let line_id = add_to_cart(&state, &buyer, &option, 2).await?;
        let checkout =
            checkout_service::checkout(&state, &buyer, checkout_request(vec![line_id]))
                .await?
                .data
                .expect("checkout data");

        let body = signed_notification(paid_data(&checkout.order_code, 200));
        let first = {
            let state = state.clone();
            let body = body.clone();
            tokio::spawn(async move { webhook_service::handle_notification(&state, None, body).await })
        };
        let second = {
            let state = state.clone();
            tokio::spawn(async move { webhook_service::handle_notification(&state, None, body).await })
        };
        first.await??;
        second.await??;

        assert_eq!(
            reload_payment(&state, checkout.payment_id).await?.status,
            PaymentStatus::Succeeded
        );
        let booked = Bookings::find()
            .filter(bookings::Column::PaymentId.eq(checkout.payment_id))
            .count(&state.orm)
            .await?;
        assert_eq!(booked, 1);
        assert_eq!(reload_option(&state, option.id).await?.capacity_sold, 2);
    }
    Ok(())
}
