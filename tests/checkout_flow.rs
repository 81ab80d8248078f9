mod common;

use std::sync::atomic::Ordering;

use common::{
    add_to_cart, checkout_request, paid_data, reload_option, reload_payment, seed_option,
    seed_tour, set_capacity_sold, setup_state, signed_notification, user,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tour_booking_api::{
    dto::cart::{AddCartItemRequest, UpdateCartItemRequest},
    entity::{
        Bookings, CartItems, Payments, Tickets, bookings, cart_items,
        payments::PaymentStatus,
        tickets::{self, TicketStatus},
        tour_options::{self, OptionStatus},
        tours,
    },
    error::AppError,
    services::{cart_service, checkout_service, finalize_service, webhook_service},
};
use uuid::Uuid;

// Cart -> checkout -> signed paid webhook -> booking, tickets, seats, empty cart.
#[tokio::test]
async fn paid_webhook_finalizes_checkout() -> anyhow::Result<()> {
    let (state, gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Ha Long Bay Cruise", 100).await?;
    let option = seed_option(&state, tour.id, 10, 30).await?;

    let line_id = add_to_cart(&state, &buyer, &option, 2).await?;

    let resp = checkout_service::checkout(&state, &buyer, checkout_request(vec![line_id])).await?;
    let checkout = resp.data.expect("checkout data");
    assert_eq!(checkout.amount, 200);
    assert_eq!(checkout.provider, common::PROVIDER);
    assert!(checkout.checkout_url.is_some());

    {
        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, 200);
        assert_eq!(requests[0].order_code.to_string(), checkout.order_code);
        assert_eq!(requests[0].items[0].quantity, 2);
    }

    let payment = reload_payment(&state, checkout.payment_id).await?;
    assert_eq!(payment.status, PaymentStatus::Created);
    assert_eq!(payment.payload.items.len(), 1);

    let body = signed_notification(paid_data(&checkout.order_code, 200));
    let ack = webhook_service::handle_notification(&state, None, body).await?;
    assert!(ack.data.expect("ack").ok);

    let payment = reload_payment(&state, checkout.payment_id).await?;
    assert_eq!(payment.status, PaymentStatus::Succeeded);
    assert!(payment.payload.callback.is_some());

    let booked = Bookings::find()
        .filter(bookings::Column::PaymentId.eq(payment.id))
        .all(&state.orm)
        .await?;
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].total, 200);
    assert_eq!(booked[0].quantity, 2);
    assert_eq!(booked[0].snapshot_title, "Ha Long Bay Cruise");

    let issued = Tickets::find()
        .filter(tickets::Column::BookingId.eq(booked[0].id))
        .all(&state.orm)
        .await?;
    assert_eq!(issued.len(), 2);
    assert!(issued.iter().all(|t| t.status == TicketStatus::Valid));
    assert!(issued.iter().all(|t| t.code.starts_with("HALONG-")));
    assert_ne!(issued[0].code, issued[1].code);

    let cart_left = CartItems::find()
        .filter(cart_items::Column::UserId.eq(buyer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(cart_left, 0);
    assert_eq!(reload_option(&state, option.id).await?.capacity_sold, 2);

    // A replayed delivery changes nothing.
    let body = signed_notification(paid_data(&checkout.order_code, 200));
    let ack = webhook_service::handle_notification(&state, None, body).await?;
    assert_eq!(ack.message, "Already processed");
    assert_eq!(Tickets::find().count(&state.orm).await?, 2);
    assert_eq!(reload_option(&state, option.id).await?.capacity_sold, 2);

    Ok(())
}

#[tokio::test]
async fn checkout_prices_from_current_tour_price() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Hoi An Lantern Walk", 100).await?;
    let option = seed_option(&state, tour.id, 10, 30).await?;
    let line_id = add_to_cart(&state, &buyer, &option, 3).await?;

    tours::ActiveModel {
        id: Set(tour.id),
        price: Set(120),
        ..Default::default()
    }
    .update(&state.orm)
    .await?;

    let resp = checkout_service::checkout(&state, &buyer, checkout_request(vec![line_id])).await?;
    let checkout = resp.data.expect("checkout data");
    assert_eq!(checkout.amount, 360);

    let payment = reload_payment(&state, checkout.payment_id).await?;
    assert_eq!(payment.payload.items[0].unit_price, 120);
    Ok(())
}

#[tokio::test]
async fn sold_out_option_blocks_checkout_without_payment() -> anyhow::Result<()> {
    let (state, gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Sapa Trek", 500).await?;
    let option = seed_option(&state, tour.id, 2, 30).await?;
    let line_id = add_to_cart(&state, &buyer, &option, 2).await?;

    // Someone else took a seat after the line went into the cart.
    set_capacity_sold(&state, option.id, 1).await?;

    let err = checkout_service::checkout(&state, &buyer, checkout_request(vec![line_id]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(Payments::find().count(&state.orm).await?, 0);
    assert_eq!(gateway.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn checkout_requires_selected_lines_from_own_cart() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let buyer = user();
    let other = user();
    let tour = seed_tour(&state, "Mekong Delta", 300).await?;
    let option = seed_option(&state, tour.id, 10, 30).await?;

    let err = checkout_service::checkout(&state, &buyer, checkout_request(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = checkout_service::checkout(&state, &buyer, checkout_request(vec![Uuid::new_v4()]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let others_line = add_to_cart(&state, &other, &option, 1).await?;
    let mine = add_to_cart(&state, &buyer, &option, 1).await?;
    let err = checkout_service::checkout(&state, &buyer, checkout_request(vec![mine, others_line]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(Payments::find().count(&state.orm).await?, 0);
    Ok(())
}

#[tokio::test]
async fn gateway_failure_leaves_created_payment() -> anyhow::Result<()> {
    let (state, gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Da Lat Flowers", 250).await?;
    let option = seed_option(&state, tour.id, 10, 30).await?;
    let line_id = add_to_cart(&state, &buyer, &option, 1).await?;

    gateway.fail_links.store(true, Ordering::SeqCst);
    let err = checkout_service::checkout(&state, &buyer, checkout_request(vec![line_id]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    let payments = Payments::find().all(&state.orm).await?;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Created);
    // Nothing is reserved until the payment is confirmed.
    assert_eq!(reload_option(&state, option.id).await?.capacity_sold, 0);
    Ok(())
}

#[tokio::test]
async fn demo_checkout_books_immediately() -> anyhow::Result<()> {
    let (state, gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Cu Chi Tunnels", 150).await?;
    let option = seed_option(&state, tour.id, 5, 30).await?;
    let line_id = add_to_cart(&state, &buyer, &option, 3).await?;

    let resp =
        checkout_service::checkout_demo(&state, &buyer, checkout_request(vec![line_id])).await?;
    let demo = resp.data.expect("demo data");
    assert_eq!(demo.amount, 450);
    assert_eq!(demo.tickets_issued, 3);
    assert_eq!(demo.bookings.len(), 1);
    assert_eq!(gateway.request_count(), 0);

    let payment = reload_payment(&state, demo.payment_id).await?;
    assert_eq!(payment.status, PaymentStatus::Succeeded);
    assert_eq!(reload_option(&state, option.id).await?.capacity_sold, 3);

    // Running finalize again is a no-op.
    let again = finalize_service::finalize(&state.orm, payment.id).await?;
    assert!(again.already_finalized);
    assert_eq!(Tickets::find().count(&state.orm).await?, 3);
    Ok(())
}

#[tokio::test]
async fn finalize_resumes_after_partial_run() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Hue Citadel", 100).await?;
    let first = seed_option(&state, tour.id, 5, 30).await?;
    let second = seed_option(&state, tour.id, 5, 31).await?;
    let line_a = add_to_cart(&state, &buyer, &first, 1).await?;
    let line_b = add_to_cart(&state, &buyer, &second, 1).await?;

    let resp =
        checkout_service::checkout(&state, &buyer, checkout_request(vec![line_a, line_b])).await?;
    let checkout = resp.data.expect("checkout data");

    // Second slot is cancelled before the money arrives, so finalize stops there.
    tour_options::ActiveModel {
        id: Set(second.id),
        status: Set(OptionStatus::Cancelled),
        ..Default::default()
    }
    .update(&state.orm)
    .await?;

    let body = signed_notification(paid_data(&checkout.order_code, 200));
    let ack = webhook_service::handle_notification(&state, None, body).await?;
    assert_eq!(ack.message, "OK");

    let payment = reload_payment(&state, checkout.payment_id).await?;
    assert_eq!(payment.status, PaymentStatus::Processing);
    assert_eq!(Bookings::find().count(&state.orm).await?, 1);

    // Operator reopens the slot and reruns finalize.
    tour_options::ActiveModel {
        id: Set(second.id),
        status: Set(OptionStatus::Open),
        ..Default::default()
    }
    .update(&state.orm)
    .await?;
    let outcome = finalize_service::finalize(&state.orm, payment.id).await?;
    assert_eq!(outcome.skipped_lines, 1);
    assert_eq!(outcome.bookings.len(), 1);

    assert_eq!(Bookings::find().count(&state.orm).await?, 2);
    assert_eq!(reload_option(&state, first.id).await?.capacity_sold, 1);
    assert_eq!(reload_option(&state, second.id).await?.capacity_sold, 1);
    assert_eq!(
        reload_payment(&state, payment.id).await?.status,
        PaymentStatus::Succeeded
    );
    Ok(())
}

#[tokio::test]
async fn cart_add_validates_option() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Phong Nha Caves", 700).await?;
    let other_tour = seed_tour(&state, "Nha Trang Islands", 400).await?;
    let option = seed_option(&state, tour.id, 3, 30).await?;
    let foreign_option = seed_option(&state, other_tour.id, 3, 30).await?;
    let started = seed_option(&state, tour.id, 3, -1).await?;

    let request = |option_id: Uuid, quantity: i32| AddCartItemRequest {
        item_type: "tour".into(),
        tour_id: tour.id,
        option_id,
        quantity,
    };

    let err = cart_service::add_item(&state, &buyer, request(option.id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = cart_service::add_item(
        &state,
        &buyer,
        AddCartItemRequest {
            item_type: "hotel".into(),
            ..request(option.id, 1)
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = cart_service::add_item(&state, &buyer, request(foreign_option.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = cart_service::add_item(&state, &buyer, request(started.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = cart_service::add_item(&state, &buyer, request(option.id, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Adding the same slot twice merges into one line, still bounded by seats left.
    cart_service::add_item(&state, &buyer, request(option.id, 2)).await?;
    let cart = cart_service::add_item(&state, &buyer, request(option.id, 1))
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.total, 2100);

    let err = cart_service::add_item(&state, &buyer, request(option.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn cart_update_and_remove_are_scoped_to_owner() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let buyer = user();
    let stranger = user();
    let tour = seed_tour(&state, "Mui Ne Dunes", 200).await?;
    let option = seed_option(&state, tour.id, 10, 30).await?;
    let line_id = add_to_cart(&state, &buyer, &option, 1).await?;

    let err = cart_service::update_item(
        &state,
        &stranger,
        line_id,
        UpdateCartItemRequest { quantity: 4 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let cart = cart_service::update_item(
        &state,
        &buyer,
        line_id,
        UpdateCartItemRequest { quantity: 4 },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(cart.items[0].quantity, 4);
    assert_eq!(cart.total, 800);

    let err = cart_service::remove_item(&state, &stranger, line_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let cart = cart_service::remove_item(&state, &buyer, line_id)
        .await?
        .data
        .expect("cart");
    assert!(cart.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn cart_add_rejects_quantity_overflow() -> anyhow::Result<()> {
    let (state, _gateway) = setup_state().await?;
    let buyer = user();
    let tour = seed_tour(&state, "Tam Coc Bikes", 100).await?;
    let option = seed_option(&state, tour.id, 10, 30).await?;
    add_to_cart(&state, &buyer, &option, 1).await?;

    let err = cart_service::add_item(
        &state,
        &buyer,
        AddCartItemRequest {
            item_type: "tour".into(),
            tour_id: tour.id,
            option_id: option.id,
            quantity: i32::MAX,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let cart = cart_service::get_cart(&state, &buyer).await?.data.expect("cart");
    assert_eq!(cart.items[0].quantity, 1);
    Ok(())
}
