use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Payment;

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<Payment>,
}
