pub mod audit_logs;
pub mod bookings;
pub mod cart_items;
pub mod payments;
pub mod tickets;
pub mod tour_options;
pub mod tours;

pub use audit_logs::Entity as AuditLogs;
pub use bookings::Entity as Bookings;
pub use cart_items::Entity as CartItems;
pub use payments::Entity as Payments;
pub use tickets::Entity as Tickets;
pub use tour_options::Entity as TourOptions;
pub use tours::Entity as Tours;
