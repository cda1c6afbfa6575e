use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use stride_core::pricing::{self, PricingConfig, Quote};
use stride_core::repository::{BookingWrite, ClassGuard, DocumentStore, TxWrites};
use stride_core::validation::{normalize_email, ReservationRequest, ValidReservation};
use stride_core::{
    run_transaction, Booking, BookingError, BookingResult, BookingStatus, BookingWithClass,
    ClassSession, RetryPolicy, Versioned,
};

/// Result of a successful `reserve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub booking_id: Uuid,
    pub status: BookingStatus,
}

/// Owns every change to a class's `booked_spots` and to booking status.
///
/// Each operation is a read-decide-commit cycle run through
/// `run_transaction`, so concurrent callers either see each other's commits
/// or retry.
pub struct BookingManager {
    store: Arc<dyn DocumentStore>,
    retry: RetryPolicy,
    pricing: PricingConfig,
}

impl BookingManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
            pricing: PricingConfig::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    /// Reserve spots in a class.
    ///
    /// Free classes are confirmed and counted immediately. Paid classes get a
    /// pending booking and hold no capacity until `confirm_payment`.
    pub async fn reserve(&self, request: ReservationRequest) -> BookingResult<Reservation> {
        let input = request.validate()?;

        let reservation = run_transaction(&self.retry, "reserve", |_| self.try_reserve(&input)).await?;

        info!(
            "Booking {} for class {} created as {} ({} spots)",
            reservation.booking_id, input.class_id, reservation.status, input.spots
        );
        Ok(reservation)
    }

    async fn try_reserve(&self, input: &ValidReservation) -> BookingResult<Reservation> {
        let class = self
            .store
            .get_class(input.class_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Class {}", input.class_id)))?;

        let available = class.record.available_spots();
        if input.spots > available {
            return Err(BookingError::CapacityExceeded {
                requested: input.spots,
                available,
            });
        }

        let (status, booked_spots) = if class.record.is_free() {
            (BookingStatus::Confirmed, Some(class.record.booked_spots + input.spots))
        } else {
            (BookingStatus::Pending, None)
        };

        let booking = Booking::new(
            input.class_id,
            input.spots,
            input.contact.clone(),
            input.membership_id.clone(),
            status,
        );
        let booking_id = booking.id;

        // Paid bookings still pin the class version so the capacity check
        // above was made against a state nobody changed before commit.
        self.store
            .commit(TxWrites {
                class: Some(ClassGuard {
                    class_id: class.record.id,
                    expected_version: class.version,
                    booked_spots,
                }),
                booking: Some(BookingWrite {
                    record: booking,
                    expected_version: None,
                }),
            })
            .await?;

        Ok(Reservation { booking_id, status })
    }

    /// Confirm a pending booking after its payment succeeded.
    ///
    /// Already-confirmed bookings return unchanged, so duplicate payment
    /// notifications never count capacity twice. On `ClassFull` the booking
    /// stays pending.
    pub async fn confirm_payment(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let booking = run_transaction(&self.retry, "confirm_payment", |_| self.try_confirm(booking_id)).await?;
        info!("Booking {} confirmed", booking_id);
        Ok(booking)
    }

    async fn try_confirm(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let current = self.load_booking(booking_id).await?;

        match current.record.status {
            BookingStatus::Confirmed => {
                debug!("Booking {} already confirmed, nothing to do", booking_id);
                return Ok(current.record);
            }
            BookingStatus::Cancelled => {
                return Err(BookingError::InvalidTransition {
                    from: BookingStatus::Cancelled.to_string(),
                    to: BookingStatus::Confirmed.to_string(),
                });
            }
            BookingStatus::Pending => {}
        }

        let class = self
            .store
            .get_class(current.record.class_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Class {}", current.record.class_id)))?;

        let available = class.record.available_spots();
        if current.record.spots > available {
            // Paid bookings hold no spot before payment, so a paid checkout
            // can lose the last spots to someone who confirmed first.
            warn!(
                "Booking {} paid but class {} has only {} of {} requested spots left",
                booking_id, class.record.id, available, current.record.spots
            );
            return Err(BookingError::ClassFull {
                requested: current.record.spots,
                available,
            });
        }

        let mut booking = current.record;
        booking.update_status(BookingStatus::Confirmed);

        self.store
            .commit(TxWrites {
                class: Some(ClassGuard {
                    class_id: class.record.id,
                    expected_version: class.version,
                    booked_spots: Some(class.record.booked_spots + booking.spots),
                }),
                booking: Some(BookingWrite {
                    record: booking.clone(),
                    expected_version: Some(current.version),
                }),
            })
            .await?;

        Ok(booking)
    }

    /// Cancel a pending booking (payment failed or the checkout expired).
    ///
    /// Cancelling twice is a no-op. Confirmed bookings cannot be cancelled
    /// here. Capacity is untouched since pending bookings never held any.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let booking = run_transaction(&self.retry, "cancel_booking", |_| self.try_cancel(booking_id)).await?;
        info!("Booking {} cancelled", booking_id);
        Ok(booking)
    }

    async fn try_cancel(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let current = self.load_booking(booking_id).await?;

        match current.record.status {
            BookingStatus::Cancelled => return Ok(current.record),
            BookingStatus::Confirmed => {
                return Err(BookingError::InvalidTransition {
                    from: BookingStatus::Confirmed.to_string(),
                    to: BookingStatus::Cancelled.to_string(),
                });
            }
            BookingStatus::Pending => {}
        }

        let mut booking = current.record;
        booking.update_status(BookingStatus::Cancelled);

        self.store
            .commit(TxWrites {
                class: None,
                booking: Some(BookingWrite {
                    record: booking.clone(),
                    expected_version: Some(current.version),
                }),
            })
            .await?;

        Ok(booking)
    }

    /// Cancel pending bookings created more than `ttl` ago.
    /// Returns how many were cancelled.
    pub async fn expire_pending(&self, ttl: chrono::Duration) -> BookingResult<usize> {
        let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
            // Cutoff predates any representable timestamp
            debug!("Expiry window {} reaches past the earliest timestamp, nothing to expire", ttl);
            return Ok(0);
        };
        let stale = self.store.pending_bookings_before(cutoff).await?;

        let mut expired = 0;
        for booking in stale {
            match self.cancel_booking(booking.id).await {
                Ok(_) => expired += 1,
                // Confirmed between the query and our cancel
                Err(BookingError::InvalidTransition { .. }) => {
                    debug!("Booking {} confirmed before it could expire", booking.id);
                }
                Err(e) => return Err(e),
            }
        }

        if expired > 0 {
            info!("Expired {} pending bookings created before {}", expired, cutoff);
        }
        Ok(expired)
    }

    /// A booking joined with its class as it is right now
    pub async fn get_booking(&self, booking_id: Uuid) -> BookingResult<BookingWithClass> {
        let booking = self.load_booking(booking_id).await?.record;
        let class = self.store.get_class(booking.class_id).await?.map(|v| v.record);
        Ok(BookingWithClass { booking, class })
    }

    /// Checkout price for a booking, including any membership discount
    pub async fn quote(&self, booking_id: Uuid) -> BookingResult<Quote> {
        let BookingWithClass { booking, class } = self.get_booking(booking_id).await?;
        let class = class.ok_or_else(|| BookingError::NotFound(format!("Class {}", booking.class_id)))?;
        Ok(pricing::quote(&self.pricing, &class, &booking))
    }

    /// Confirmed bookings for a member, newest class first.
    ///
    /// Each booking carries its class as read during this call; bookings
    /// whose class was removed keep `class = None` and come last.
    pub async fn list_confirmed_bookings(&self, email: &str) -> BookingResult<Vec<BookingWithClass>> {
        let email = normalize_email(email);
        let bookings = self.store.bookings_by_email(&email).await?;

        let mut classes: HashMap<Uuid, Option<ClassSession>> = HashMap::new();
        let mut listed = Vec::new();

        for booking in bookings.into_iter().filter(|b| b.status == BookingStatus::Confirmed) {
            let class = match classes.get(&booking.class_id) {
                Some(cached) => cached.clone(),
                None => {
                    let fetched = self.store.get_class(booking.class_id).await?.map(|v| v.record);
                    classes.insert(booking.class_id, fetched.clone());
                    fetched
                }
            };
            listed.push(BookingWithClass { booking, class });
        }

        listed.sort_by(newest_class_first);
        Ok(listed)
    }

    /// Every booking for a class regardless of status, newest first
    pub async fn list_bookings_for_class(&self, class_id: Uuid) -> BookingResult<Vec<Booking>> {
        if self.store.get_class(class_id).await?.is_none() {
            return Err(BookingError::NotFound(format!("Class {}", class_id)));
        }
        let mut bookings = self.store.bookings_by_class(class_id).await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn load_booking(&self, booking_id: Uuid) -> BookingResult<Versioned<Booking>> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Booking {}", booking_id)))
    }
}

fn newest_class_first(a: &BookingWithClass, b: &BookingWithClass) -> Ordering {
    let by_class = match (&a.class, &b.class) {
        (Some(ca), Some(cb)) => (cb.date, cb.time).cmp(&(ca.date, ca.time)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_class.then_with(|| b.booking.created_at.cmp(&a.booking.created_at))
}
