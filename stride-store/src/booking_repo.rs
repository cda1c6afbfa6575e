use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;
use stride_core::repository::{BookingWrite, ClassGuard, DocumentStore, TxWrites};
use stride_core::{Booking, BookingStatus, ClassSession, Contact, StoreError, Versioned};

/// Postgres-backed document store.
///
/// Every row carries a `version`; commits apply conditional writes inside
/// one database transaction and report a conflict when any row moved.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ClassRow {
    id: Uuid,
    title: String,
    trainer: String,
    description: String,
    class_date: NaiveDate,
    start_time: NaiveTime,
    max_spots: i32,
    booked_spots: i32,
    price_cents: Option<i64>,
    version: i64,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    class_id: Uuid,
    spots: i32,
    contact_name: String,
    contact_email: String,
    status: String,
    membership_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

const CLASS_COLUMNS: &str = "id, title, trainer, description, class_date, start_time, max_spots, booked_spots, price_cents, version";
const BOOKING_COLUMNS: &str = "id, class_id, spots, contact_name, contact_email, status, membership_id, created_at, updated_at, version";

fn to_u32(value: i32, field: &str, id: Uuid) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{} = {} on {}", field, value, id)))
}

fn to_i32(value: u32, field: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{} = {} out of range", field, value)))
}

impl TryFrom<ClassRow> for Versioned<ClassSession> {
    type Error = StoreError;

    fn try_from(row: ClassRow) -> Result<Self, Self::Error> {
        let class = ClassSession {
            id: row.id,
            title: row.title,
            trainer: row.trainer,
            description: row.description,
            date: row.class_date,
            time: row.start_time,
            max_spots: to_u32(row.max_spots, "max_spots", row.id)?,
            booked_spots: to_u32(row.booked_spots, "booked_spots", row.id)?,
            price_cents: row.price_cents,
        };
        Ok(Versioned::new(class, row.version))
    }
}

impl TryFrom<BookingRow> for Versioned<Booking> {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row.status.parse().map_err(StoreError::Corrupt)?;
        let booking = Booking {
            id: row.id,
            class_id: row.class_id,
            spots: to_u32(row.spots, "spots", row.id)?,
            contact: Contact::new(row.contact_name, row.contact_email),
            status,
            membership_id: row.membership_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        Ok(Versioned::new(booking, row.version))
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, StoreError> {
    rows.into_iter()
        .map(|row| Versioned::<Booking>::try_from(row).map(|v| v.record))
        .collect()
}

const CAPACITY_CONSTRAINT: &str = "booked_within_capacity";

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => {
            classify_db_error(db.code().as_deref(), db.constraint(), db.message())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(err.to_string())
        }
        _ => StoreError::Unavailable(err.to_string()),
    }
}

/// Serialization failures and deadlocks are retried. So is a violation of
/// the capacity CHECK, since the counter moved underneath us. Any other CHECK
/// failure means we wrote a bad row.
fn classify_db_error(code: Option<&str>, constraint: Option<&str>, message: &str) -> StoreError {
    match (code, constraint) {
        (Some("40001") | Some("40P01"), _) => StoreError::Conflict(message.to_string()),
        (Some("23514"), Some(CAPACITY_CONSTRAINT)) => StoreError::Conflict(message.to_string()),
        (Some("23514"), _) => StoreError::Corrupt(message.to_string()),
        _ => StoreError::Unavailable(message.to_string()),
    }
}

async fn apply_class_guard(
    tx: &mut Transaction<'_, Postgres>,
    guard: &ClassGuard,
) -> Result<(), StoreError> {
    match guard.booked_spots {
        Some(booked) => {
            let result = sqlx::query(
                "UPDATE classes SET booked_spots = $1, version = version + 1 WHERE id = $2 AND version = $3",
            )
            .bind(to_i32(booked, "booked_spots")?)
            .bind(guard.class_id)
            .bind(guard.expected_version)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::Conflict(format!("class {} moved past version {}", guard.class_id, guard.expected_version)));
            }
        }
        None => {
            // Share lock keeps the class at this version until we commit
            let current: Option<i64> = sqlx::query_scalar("SELECT version FROM classes WHERE id = $1 FOR SHARE")
                .bind(guard.class_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_sqlx)?;

            if current != Some(guard.expected_version) {
                return Err(StoreError::Conflict(format!("class {} moved past version {}", guard.class_id, guard.expected_version)));
            }
        }
    }
    Ok(())
}

async fn apply_booking_write(
    tx: &mut Transaction<'_, Postgres>,
    write: &BookingWrite,
) -> Result<(), StoreError> {
    let b = &write.record;
    let result = match write.expected_version {
        None => {
            sqlx::query(
                r#"
                INSERT INTO bookings (id, class_id, spots, contact_name, contact_email, status, membership_id, created_at, updated_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(b.id)
            .bind(b.class_id)
            .bind(to_i32(b.spots, "spots")?)
            .bind(&b.contact.name)
            .bind(&b.contact.email)
            .bind(b.status.as_str())
            .bind(&b.membership_id)
            .bind(b.created_at)
            .bind(b.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx)?
        }
        Some(expected) => {
            // Only the lifecycle fields change after creation
            sqlx::query(
                "UPDATE bookings SET status = $1, updated_at = $2, version = version + 1 WHERE id = $3 AND version = $4",
            )
            .bind(b.status.as_str())
            .bind(b.updated_at)
            .bind(b.id)
            .bind(expected)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx)?
        }
    };

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict(format!("booking {} changed concurrently", b.id)));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_class(&self, id: Uuid) -> Result<Option<Versioned<ClassSession>>, StoreError> {
        let row: Option<ClassRow> = sqlx::query_as(&format!("SELECT {} FROM classes WHERE id = $1", CLASS_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(Versioned::<ClassSession>::try_from).transpose()
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Versioned<Booking>>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        row.map(Versioned::<Booking>::try_from).transpose()
    }

    async fn bookings_by_email(&self, email: &str) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE contact_email = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        into_bookings(rows)
    }

    async fn bookings_by_class(&self, class_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE class_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(class_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        into_bookings(rows)
    }

    async fn pending_bookings_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE status = 'pending' AND created_at < $1 ORDER BY created_at",
            BOOKING_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        into_bookings(rows)
    }

    async fn commit(&self, writes: TxWrites) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // Returning early drops `tx`, which rolls everything back
        if let Some(guard) = &writes.class {
            apply_class_guard(&mut tx, guard).await?;
        }
        if let Some(write) = &writes.booking {
            apply_booking_write(&mut tx, write).await?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        debug!("Committed transaction: class={:?} booking={:?}",
            writes.class.as_ref().map(|g| g.class_id),
            writes.booking.as_ref().map(|w| w.record.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_row(max_spots: i32, booked_spots: i32) -> ClassRow {
        ClassRow {
            id: Uuid::new_v4(),
            title: "HIIT".to_string(),
            trainer: "Sam".to_string(),
            description: String::new(),
            class_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            max_spots,
            booked_spots,
            price_cents: Some(1500),
            version: 4,
        }
    }

    #[test]
    fn test_class_row_maps_to_domain() {
        let v = Versioned::<ClassSession>::try_from(class_row(12, 3)).unwrap();
        assert_eq!(v.version, 4);
        assert_eq!(v.record.available_spots(), 9);
        assert!(!v.record.is_free());
    }

    #[test]
    fn test_negative_counter_is_corrupt() {
        let err = Versioned::<ClassSession>::try_from(class_row(12, -1)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let row = BookingRow {
            id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            spots: 1,
            contact_name: "Kim".to_string(),
            contact_email: "kim@example.com".to_string(),
            status: "refunded".to_string(),
            membership_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        };
        assert!(matches!(Versioned::<Booking>::try_from(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_only_capacity_check_is_retried() {
        let capacity = classify_db_error(Some("23514"), Some("booked_within_capacity"), "over capacity");
        assert!(matches!(capacity, StoreError::Conflict(_)));

        let spots = classify_db_error(Some("23514"), Some("bookings_spots_check"), "spots");
        assert!(matches!(spots, StoreError::Corrupt(_)));

        let unnamed = classify_db_error(Some("23514"), None, "check");
        assert!(matches!(unnamed, StoreError::Corrupt(_)));

        assert!(matches!(classify_db_error(Some("40001"), None, "serialize"), StoreError::Conflict(_)));
        assert!(matches!(classify_db_error(Some("40P01"), None, "deadlock"), StoreError::Conflict(_)));
        assert!(matches!(classify_db_error(Some("23505"), None, "dup"), StoreError::Unavailable(_)));
    }
}
