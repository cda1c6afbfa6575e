pub mod manager;
pub mod payments;

pub use manager::{BookingManager, Reservation};
pub use payments::PaymentOutcome;
