use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    bookings::{self, BookingPaymentStatus, BookingStatus},
    payments::{self, PaymentLine, PaymentStatus},
    tickets::{self, TicketStatus},
    tour_options::{self, OptionStatus},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct TourOption {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub start_date: NaiveDate,
    pub start_time: Option<String>,
    pub capacity_total: i32,
    pub capacity_sold: i32,
    pub remaining: i32,
    pub cut_off_hours: i32,
    #[schema(value_type = String)]
    pub status: OptionStatus,
    pub is_disabled: bool,
}

impl From<tour_options::Model> for TourOption {
    fn from(model: tour_options::Model) -> Self {
        Self {
            remaining: model.remaining(),
            is_disabled: !model.is_bookable_now(),
            id: model.id,
            tour_id: model.tour_id,
            start_date: model.start_date,
            start_time: model.start_time,
            capacity_total: model.capacity_total,
            capacity_sold: model.capacity_sold,
            cut_off_hours: model.cut_off_hours,
            status: model.status,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLine {
    pub id: Uuid,
    pub item_type: String,
    pub tour_id: Uuid,
    pub tour_title: Option<String>,
    pub option_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<String>,
    #[schema(value_type = Option<String>)]
    pub option_status: Option<OptionStatus>,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub provider: String,
    pub intent_id: String,
    pub amount: i64,
    #[schema(value_type = String)]
    pub status: PaymentStatus,
    pub user_id: Uuid,
    pub items: Vec<PaymentLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payments::Model> for Payment {
    fn from(model: payments::Model) -> Self {
        Self {
            id: model.id,
            provider: model.provider,
            intent_id: model.intent_id,
            amount: model.amount,
            status: model.status,
            user_id: model.user_id,
            items: model.payload.items,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Booking {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub tour_id: Uuid,
    pub option_id: Uuid,
    pub start_date: NaiveDate,
    pub start_time: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
    #[schema(value_type = String)]
    pub status: BookingStatus,
    #[schema(value_type = String)]
    pub payment_status: BookingPaymentStatus,
    pub snapshot_title: String,
    pub snapshot_destination: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<bookings::Model> for Booking {
    fn from(model: bookings::Model) -> Self {
        Self {
            id: model.id,
            payment_id: model.payment_id,
            user_id: model.user_id,
            tour_id: model.tour_id,
            option_id: model.option_id,
            start_date: model.start_date,
            start_time: model.start_time,
            quantity: model.quantity,
            unit_price: model.unit_price,
            total: model.total,
            status: model.status,
            payment_status: model.payment_status,
            snapshot_title: model.snapshot_title,
            snapshot_destination: model.snapshot_destination,
            contact_name: model.contact_name,
            contact_phone: model.contact_phone,
            note: model.note,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Ticket {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub code: String,
    pub qr_payload: String,
    #[schema(value_type = String)]
    pub status: TicketStatus,
    pub passenger_name: Option<String>,
    pub passenger_phone: Option<String>,
    pub passenger_address: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<tickets::Model> for Ticket {
    fn from(model: tickets::Model) -> Self {
        Self {
            id: model.id,
            booking_id: model.booking_id,
            code: model.code,
            qr_payload: model.qr_payload,
            status: model.status,
            passenger_name: model.passenger_name,
            passenger_phone: model.passenger_phone,
            passenger_address: model.passenger_address,
            used_at: model.used_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
