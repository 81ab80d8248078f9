use std::collections::HashSet;

use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, SqlErr};
use uuid::Uuid;

use crate::{
    audit,
    dto::checkout::{CheckoutRequest, CheckoutResponse, DemoCheckoutResponse},
    entity::{
        payments::{
            ActiveModel as PaymentActive, Model as PaymentModel, PaymentLine, PaymentPayload,
            PaymentStatus,
        },
        tour_options::{Entity as TourOptions, OptionStatus},
        tours::Entity as Tours,
    },
    error::{AppError, AppResult},
    gateway::{PaymentLinkItem, PaymentLinkRequest},
    middleware::auth::AuthUser,
    models::Booking,
    response::ApiResponse,
    services::{cart_service, finalize_service},
    state::AppState,
};

const ORDER_CODE_ATTEMPTS: usize = 3;

/// Selected cart lines, re-validated and re-priced against the live catalog.
#[derive(Debug)]
pub struct PreparedCheckout {
    pub lines: Vec<PaymentLine>,
    pub amount: i64,
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let prepared = prepare(state, user, &payload).await?;
    let payment = create_payment(state, user, prepared).await?;
    let order_code = payment
        .intent_id
        .parse::<i64>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("order code is not numeric: {e}")))?;

    let request = PaymentLinkRequest {
        order_code,
        amount: payment.amount,
        description: format!("Tour #{order_code}"),
        return_url: format!("{}/checkout/success?order={order_code}", state.client_url),
        cancel_url: format!("{}/checkout/cancel?order={order_code}", state.client_url),
        items: payment
            .payload
            .items
            .iter()
            .map(|line| PaymentLinkItem {
                name: line.title.clone(),
                quantity: line.quantity,
                price: line.unit_price,
            })
            .collect(),
    };

    let link = state
        .gateway
        .create_payment_link(&request)
        .await
        .inspect_err(|err| {
            tracing::error!(
                error = %err,
                payment_id = %payment.id,
                order_code,
                "payment link request failed"
            );
        })?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "checkout",
        "payments",
        serde_json::json!({
            "payment_id": payment.id,
            "order_code": payment.intent_id,
            "amount": payment.amount,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout created",
        CheckoutResponse {
            provider: payment.provider,
            payment_id: payment.id,
            order_code: payment.intent_id,
            amount: payment.amount,
            checkout_url: link.checkout_url,
            qr_code: link.qr_code,
        },
        None,
    ))
}

/// Same validation as [`checkout`], then finalizes on the spot without a gateway round trip.
pub async fn checkout_demo(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<DemoCheckoutResponse>> {
    let prepared = prepare(state, user, &payload).await?;
    let payment = create_payment(state, user, prepared).await?;

    let demo_callback = serde_json::json!({ "source": "demo", "orderCode": payment.intent_id });
    if !finalize_service::begin_processing(&state.orm, &payment, Some(demo_callback)).await? {
        return Err(AppError::BadRequest("Payment already finalized".into()));
    }
    let outcome = finalize_service::finalize(&state.orm, payment.id).await?;

    Ok(ApiResponse::success(
        "Demo checkout completed",
        DemoCheckoutResponse {
            payment_id: payment.id,
            order_code: payment.intent_id,
            amount: payment.amount,
            tickets_issued: outcome.tickets_issued,
            bookings: outcome.bookings.into_iter().map(Booking::from).collect(),
        },
        None,
    ))
}

/// Validates the selected lines and prices them at today's tour price.
///
/// Capacity checks here are a pre-flight only; the ledger re-checks at finalize.
pub async fn prepare(
    state: &AppState,
    user: &AuthUser,
    payload: &CheckoutRequest,
) -> AppResult<PreparedCheckout> {
    if payload.item_ids.is_empty() {
        return Err(AppError::BadRequest("No cart items selected".into()));
    }

    let cart = cart_service::cart_lines(state, user.user_id).await?;
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart empty".into()));
    }

    let wanted: HashSet<Uuid> = payload.item_ids.iter().copied().collect();
    let selected: Vec<_> = cart
        .into_iter()
        .filter(|line| wanted.contains(&line.id))
        .collect();
    if selected.len() != wanted.len() {
        return Err(AppError::BadRequest("Selected items are not in your cart".into()));
    }

    let mut lines = Vec::with_capacity(selected.len());
    for item in selected {
        let tour = Tours::find_by_id(item.tour_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::not_found("Tour"))?;
        let option = TourOptions::find_by_id(item.option_id)
            .one(&state.orm)
            .await?
            .filter(|opt| opt.tour_id == tour.id)
            .ok_or_else(|| AppError::not_found("Tour option"))?;

        if option.status != OptionStatus::Open {
            return Err(AppError::BadRequest(format!(
                "Option for {} is not open for booking",
                tour.title
            )));
        }
        let remaining = option.remaining();
        if remaining < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Only {remaining} seats left for {}",
                tour.title
            )));
        }

        lines.push(PaymentLine {
            cart_item_id: item.id,
            tour_id: tour.id,
            option_id: option.id,
            quantity: item.quantity,
            unit_price: tour.price,
            title: tour.title,
            destination: tour.destination,
            contact: payload.contacts.get(&item.id).cloned().unwrap_or_default(),
        });
    }

    let amount: i64 = lines.iter().map(PaymentLine::total).sum();
    if amount <= 0 {
        return Err(AppError::BadRequest("Invalid amount".into()));
    }

    Ok(PreparedCheckout { lines, amount })
}

/// Persists a `created` payment under a fresh order code.
pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    prepared: PreparedCheckout,
) -> AppResult<PaymentModel> {
    let provider = state.gateway.provider();
    let payload = PaymentPayload {
        items: prepared.lines,
        callback: None,
    };

    for attempt in 1..=ORDER_CODE_ATTEMPTS {
        let now = Utc::now().fixed_offset();
        let inserted = PaymentActive {
            id: Set(Uuid::new_v4()),
            provider: Set(provider.to_string()),
            intent_id: Set(generate_order_code().to_string()),
            amount: Set(prepared.amount),
            status: Set(PaymentStatus::Created),
            user_id: Set(user.user_id),
            payload: Set(payload.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&state.orm)
        .await;

        match inserted {
            Ok(payment) => {
                tracing::info!(
                    payment_id = %payment.id,
                    order_code = %payment.intent_id,
                    amount = payment.amount,
                    "payment created"
                );
                return Ok(payment);
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::warn!(attempt, "order code collision, drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a unique order code"
    )))
}

/// Order code: milliseconds clock tail plus four random digits, never below 1000
/// so it cannot collide with the gateway's ping order code.
pub fn generate_order_code() -> i64 {
    let clock = Utc::now().timestamp_millis().rem_euclid(1_000_000_000);
    let salt = rand::thread_rng().gen_range(1000..10_000);
    clock * 10_000 + salt
}
