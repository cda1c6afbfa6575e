use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use stride_core::{Booking, BookingResult};
use crate::manager::BookingManager;

/// Final payment state reported for a pending booking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Canceled,
}

impl BookingManager {
    /// Apply a payment result to its booking: success confirms it, failure
    /// or cancellation cancels it. Safe to call again with the same outcome.
    pub async fn reconcile_payment(
        &self,
        booking_id: Uuid,
        outcome: PaymentOutcome,
    ) -> BookingResult<Booking> {
        info!("Reconciling payment {:?} for booking {}", outcome, booking_id);

        match outcome {
            PaymentOutcome::Succeeded => self.confirm_payment(booking_id).await,
            PaymentOutcome::Failed | PaymentOutcome::Canceled => self.cancel_booking(booking_id).await,
        }
    }
}
