use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use stride_core::repository::{DocumentStore, TxWrites};
use stride_core::{Booking, BookingStatus, ClassSession, StoreError, Versioned};

#[derive(Default)]
struct Inner {
    classes: HashMap<Uuid, Versioned<ClassSession>>,
    bookings: HashMap<Uuid, Versioned<Booking>>,
}

/// In-process document store with the same optimistic commit rules as the
/// Postgres adapter. Used for development and tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog-side insert or replace of a class record
    pub async fn put_class(&self, class: ClassSession) {
        let mut inner = self.inner.write().await;
        let version = inner.classes.get(&class.id).map_or(0, |v| v.version + 1);
        inner.classes.insert(class.id, Versioned::new(class, version));
    }

    /// Catalog-side delete; bookings for the class are kept
    pub async fn remove_class(&self, id: Uuid) -> bool {
        self.inner.write().await.classes.remove(&id).is_some()
    }

    fn sorted_newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bookings
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_class(&self, id: Uuid) -> Result<Option<Versioned<ClassSession>>, StoreError> {
        Ok(self.inner.read().await.classes.get(&id).cloned())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Versioned<Booking>>, StoreError> {
        Ok(self.inner.read().await.bookings.get(&id).cloned())
    }

    async fn bookings_by_email(&self, email: &str) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner
            .bookings
            .values()
            .filter(|v| v.record.contact.email == email)
            .map(|v| v.record.clone())
            .collect();
        Ok(Self::sorted_newest_first(found))
    }

    async fn bookings_by_class(&self, class_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner
            .bookings
            .values()
            .filter(|v| v.record.class_id == class_id)
            .map(|v| v.record.clone())
            .collect();
        Ok(Self::sorted_newest_first(found))
    }

    async fn pending_bookings_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.read().await;
        let mut found: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|v| v.record.status == BookingStatus::Pending && v.record.created_at < cutoff)
            .map(|v| v.record.clone())
            .collect();
        found.sort_by_key(|b| b.created_at);
        Ok(found)
    }

    async fn commit(&self, writes: TxWrites) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        // Check every expectation before touching anything
        if let Some(guard) = &writes.class {
            let current = inner
                .classes
                .get(&guard.class_id)
                .ok_or_else(|| StoreError::Conflict(format!("class {} disappeared", guard.class_id)))?;
            if current.version != guard.expected_version {
                return Err(StoreError::Conflict(format!(
                    "class {} at version {}, expected {}",
                    guard.class_id, current.version, guard.expected_version
                )));
            }
            if let Some(booked) = guard.booked_spots {
                if booked > current.record.max_spots {
                    return Err(StoreError::Conflict(format!(
                        "class {} would hold {} of {} spots",
                        guard.class_id, booked, current.record.max_spots
                    )));
                }
            }
        }
        if let Some(write) = &writes.booking {
            let existing = inner.bookings.get(&write.record.id).map(|v| v.version);
            if existing != write.expected_version {
                return Err(StoreError::Conflict(format!(
                    "booking {} at version {:?}, expected {:?}",
                    write.record.id, existing, write.expected_version
                )));
            }
        }

        if let Some(guard) = writes.class {
            if let (Some(booked), Some(current)) = (guard.booked_spots, inner.classes.get_mut(&guard.class_id)) {
                current.record.booked_spots = booked;
                current.version += 1;
            }
        }
        if let Some(write) = writes.booking {
            let version = write.expected_version.map_or(0, |v| v + 1);
            inner.bookings.insert(write.record.id, Versioned::new(write.record, version));
        }

        Ok(())
    }
}
