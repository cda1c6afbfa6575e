pub mod error;
pub mod models;
pub mod pricing;
pub mod repository;
pub mod transaction;
pub mod validation;

pub use error::{BookingError, BookingResult, FieldError, StoreError};
pub use models::{Booking, BookingStatus, BookingWithClass, ClassSession, Contact, Versioned};
pub use pricing::{PricingConfig, Quote};
pub use repository::{BookingWrite, ClassGuard, DocumentStore, TxWrites};
pub use transaction::{run_transaction, RetryPolicy};
pub use validation::{ReservationRequest, ValidReservation};
