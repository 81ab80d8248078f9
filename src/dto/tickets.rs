use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Booking, Ticket},
    routes::params::Pagination,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketList {
    pub items: Vec<Ticket>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketWithBooking {
    pub ticket: Ticket,
    pub booking: Booking,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TicketQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub booking_id: Option<Uuid>,
    pub q: Option<String>,
}

impl TicketQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
