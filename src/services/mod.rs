pub mod admin_service;
pub mod booking_service;
pub mod cart_service;
pub mod checkout_service;
pub mod finalize_service;
pub mod inventory_service;
pub mod payment_service;
pub mod ticket_service;
pub mod tour_service;
pub mod webhook_service;
