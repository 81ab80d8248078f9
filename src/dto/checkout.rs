use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{entity::payments::ContactInfo, models::Booking};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Cart line ids to purchase.
    pub item_ids: Vec<Uuid>,
    /// Optional contact details keyed by cart line id.
    #[serde(default)]
    pub contacts: HashMap<Uuid, ContactInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub provider: String,
    pub payment_id: Uuid,
    pub order_code: String,
    pub amount: i64,
    pub checkout_url: Option<String>,
    pub qr_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DemoCheckoutResponse {
    pub payment_id: Uuid,
    pub order_code: String,
    pub amount: i64,
    pub bookings: Vec<Booking>,
    pub tickets_issued: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub ok: bool,
}
