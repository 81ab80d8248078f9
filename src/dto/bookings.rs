use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{Booking, Ticket},
    routes::params::Pagination,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingList {
    pub items: Vec<Booking>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingWithTickets {
    pub booking: Booking,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookingListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
}

impl BookingListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
