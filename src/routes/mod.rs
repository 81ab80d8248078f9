use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod bookings;
pub mod cart;
pub mod checkout;
pub mod doc;
pub mod health;
pub mod params;
pub mod payments;
pub mod tickets;
pub mod tours;
pub mod webhooks;

// State is attached at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/tours", tours::router())
        .nest("/cart", cart::router())
        .nest("/checkout", checkout::router())
        .nest("/webhooks", webhooks::router())
        .nest("/bookings", bookings::router())
        .nest("/tickets", tickets::router())
        .nest("/payments", payments::router())
        .nest("/admin", admin::router())
}
