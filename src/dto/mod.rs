pub mod bookings;
pub mod cart;
pub mod checkout;
pub mod payments;
pub mod tickets;
pub mod tours;
