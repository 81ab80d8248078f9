#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    Schema, Set, sea_query::Index,
};
use serde_json::{Value, json};
use tour_booking_api::{
    dto::{cart::AddCartItemRequest, checkout::CheckoutRequest},
    entity::{
        AuditLogs, Bookings, CartItems, Payments, Tickets, TourOptions, Tours, bookings, payments,
        tour_options::{self, OptionStatus},
        tours,
    },
    gateway::{
        NotificationOutcome, PaymentGateway, PaymentLink, PaymentLinkRequest, PaymentNotification,
        payos, signature,
    },
    middleware::auth::AuthUser,
    services::cart_service,
    state::AppState,
};
use uuid::Uuid;

pub const CHECKSUM_KEY: &str = "test-checksum-key";
pub const PROVIDER: &str = "fakepay";

/// Gateway double: signs with a fixed key and records every link request.
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<PaymentLinkRequest>>,
    pub fail_links: AtomicBool,
}

impl FakeGateway {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn create_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> anyhow::Result<PaymentLink> {
        if self.fail_links.load(Ordering::SeqCst) {
            anyhow::bail!("gateway unavailable");
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(PaymentLink {
            checkout_url: Some(format!("https://pay.example/{}", request.order_code)),
            qr_code: Some(format!("qr-{}", request.order_code)),
        })
    }

    fn verify_notification(&self, notification: &PaymentNotification, signature: &str) -> bool {
        signature::verify(CHECKSUM_KEY, &notification.data, signature)
    }

    fn classify(&self, notification: &PaymentNotification) -> NotificationOutcome {
        payos::classify(notification)
    }

    fn is_ping(&self, notification: &PaymentNotification) -> bool {
        payos::is_ping(notification)
    }
}

/// Fresh in-memory database with the schema built from the entities.
pub async fn setup_state() -> anyhow::Result<(AppState, Arc<FakeGateway>)> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection keeps every query on the same in-memory database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;
    create_schema(&orm).await?;

    let gateway = Arc::new(FakeGateway::default());
    let state = AppState {
        orm,
        gateway: gateway.clone(),
        client_url: "http://localhost:5173".into(),
        jwt_secret: "test-secret".into(),
    };
    Ok((state, gateway))
}

async fn create_schema(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let backend = orm.get_database_backend();
    let schema = Schema::new(backend);

    orm.execute(backend.build(&schema.create_table_from_entity(Tours)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(TourOptions)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(CartItems)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(Payments)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(Bookings)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(Tickets)))
        .await?;
    orm.execute(backend.build(&schema.create_table_from_entity(AuditLogs)))
        .await?;

    let payment_intent = Index::create()
        .name("payments_provider_intent_key")
        .table(Payments)
        .col(payments::Column::Provider)
        .col(payments::Column::IntentId)
        .unique()
        .to_owned();
    orm.execute(backend.build(&payment_intent)).await?;

    let booking_line = Index::create()
        .name("bookings_payment_line_key")
        .table(Bookings)
        .col(bookings::Column::PaymentId)
        .col(bookings::Column::CartItemId)
        .unique()
        .to_owned();
    orm.execute(backend.build(&booking_line)).await?;
    Ok(())
}

pub fn user() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".into(),
    }
}

pub async fn seed_tour(state: &AppState, title: &str, price: i64) -> anyhow::Result<tours::Model> {
    let tour = tours::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        destination: Set("Quang Ninh".to_string()),
        price: Set(price),
        is_active: Set(true),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&state.orm)
    .await?;
    Ok(tour)
}

/// Open option starting `days_ahead` days from now at 09:00.
pub async fn seed_option(
    state: &AppState,
    tour_id: Uuid,
    capacity_total: i32,
    days_ahead: i64,
) -> anyhow::Result<tour_options::Model> {
    let now = Utc::now().fixed_offset();
    let option = tour_options::ActiveModel {
        id: Set(Uuid::new_v4()),
        tour_id: Set(tour_id),
        start_date: Set((Utc::now() + Duration::days(days_ahead)).date_naive()),
        start_time: Set(Some("09:00".to_string())),
        capacity_total: Set(capacity_total),
        capacity_sold: Set(0),
        cut_off_hours: Set(2),
        status: Set(OptionStatus::Open),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.orm)
    .await?;
    Ok(option)
}

pub async fn set_capacity_sold(
    state: &AppState,
    option_id: Uuid,
    sold: i32,
) -> anyhow::Result<()> {
    tour_options::ActiveModel {
        id: Set(option_id),
        capacity_sold: Set(sold),
        ..Default::default()
    }
    .update(&state.orm)
    .await?;
    Ok(())
}

pub async fn reload_option(
    state: &AppState,
    option_id: Uuid,
) -> anyhow::Result<tour_options::Model> {
    TourOptions::find_by_id(option_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("option {option_id} missing"))
}

pub async fn reload_payment(state: &AppState, payment_id: Uuid) -> anyhow::Result<payments::Model> {
    Payments::find_by_id(payment_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("payment {payment_id} missing"))
}

/// Puts `quantity` seats of the option in the cart and returns the cart line id.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    option: &tour_options::Model,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let resp = cart_service::add_item(
        state,
        user,
        AddCartItemRequest {
            item_type: "tour".into(),
            tour_id: option.tour_id,
            option_id: option.id,
            quantity,
        },
    )
    .await?;
    let cart = resp.data.expect("cart view");
    let line = cart
        .items
        .iter()
        .find(|line| line.option_id == option.id)
        .expect("cart line for option");
    Ok(line.id)
}

pub fn checkout_request(item_ids: Vec<Uuid>) -> CheckoutRequest {
    CheckoutRequest {
        item_ids,
        ..Default::default()
    }
}

/// Notification body signed the way the gateway signs it.
pub fn signed_notification(data: Value) -> Value {
    let map = data.as_object().expect("data object").clone();
    let sig = signature::sign(CHECKSUM_KEY, &map).expect("signature");
    json!({
        "code": "00",
        "desc": "success",
        "success": true,
        "data": data,
        "signature": sig,
    })
}

pub fn paid_data(order_code: &str, amount: i64) -> Value {
    json!({
        "orderCode": order_code.parse::<i64>().expect("numeric order code"),
        "amount": amount,
        "description": format!("Tour #{order_code}"),
        "code": "00",
        "desc": "success",
    })
}
