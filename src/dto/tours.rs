use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::TourOption;

#[derive(Debug, Serialize, ToSchema)]
pub struct TourOptionList {
    pub items: Vec<TourOption>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TourOptionQuery {
    /// Only options that can still be booked right now.
    #[serde(default)]
    pub only_open: bool,
}
