use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::error::StoreError;
use crate::models::{Booking, ClassSession, Versioned};

/// Precondition (and optional capacity update) on a class record.
///
/// The commit only succeeds if the class is still at `expected_version`.
/// When `booked_spots` is set, the counter is overwritten and the version
/// bumped; otherwise the class is only checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassGuard {
    pub class_id: Uuid,
    pub expected_version: i64,
    pub booked_spots: Option<u32>,
}

/// Booking record to write. `expected_version = None` means insert: the
/// booking must not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingWrite {
    pub record: Booking,
    pub expected_version: Option<i64>,
}

/// Everything one transaction writes, applied all-or-nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxWrites {
    pub class: Option<ClassGuard>,
    pub booking: Option<BookingWrite>,
}

impl TxWrites {
    pub fn is_empty(&self) -> bool {
        self.class.is_none() && self.booking.is_none()
    }
}

/// Document store access used by the booking manager.
///
/// `commit` is the only way `booked_spots` changes. Adapters must apply a
/// `TxWrites` atomically and return `StoreError::Conflict` without writing
/// anything when any version expectation fails.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_class(&self, id: Uuid) -> Result<Option<Versioned<ClassSession>>, StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Versioned<Booking>>, StoreError>;

    /// All bookings for a contact email, any status
    async fn bookings_by_email(&self, email: &str) -> Result<Vec<Booking>, StoreError>;

    async fn bookings_by_class(&self, class_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    /// Pending bookings created strictly before `cutoff`
    async fn pending_bookings_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn commit(&self, writes: TxWrites) -> Result<(), StoreError>;
}
