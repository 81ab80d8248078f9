use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::CartLine;

fn default_item_type() -> String {
    "tour".to_string()
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    #[serde(default = "default_item_type")]
    pub item_type: String,
    pub tour_id: Uuid,
    pub option_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub user_id: Uuid,
    pub items: Vec<CartLine>,
    pub total: i64,
}
