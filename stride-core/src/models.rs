use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Confirmed and cancelled bookings never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// A scheduled class with a fixed number of spots.
///
/// The catalog owns everything here except `booked_spots`, which only the
/// booking manager adjusts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassSession {
    pub id: Uuid,
    pub title: String,
    pub trainer: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub max_spots: u32,
    pub booked_spots: u32,
    /// Price per spot in cents; `None` or non-positive means free
    pub price_cents: Option<i64>,
}

impl ClassSession {
    pub fn new(title: impl Into<String>, date: NaiveDate, time: NaiveTime, max_spots: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            trainer: String::new(),
            description: String::new(),
            date,
            time,
            max_spots,
            booked_spots: 0,
            price_cents: None,
        }
    }

    pub fn with_price(mut self, price_cents: i64) -> Self {
        self.price_cents = Some(price_cents);
        self
    }

    pub fn is_free(&self) -> bool {
        self.price_cents.map_or(true, |p| p <= 0)
    }

    pub fn available_spots(&self) -> u32 {
        self.max_spots.saturating_sub(self.booked_spots)
    }
}

/// Who a booking belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub email: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A member's reservation against a class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub class_id: Uuid,
    pub spots: u32,
    pub contact: Contact,
    pub status: BookingStatus,
    pub membership_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        class_id: Uuid,
        spots: u32,
        contact: Contact,
        membership_id: Option<String>,
        status: BookingStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            class_id,
            spots,
            contact,
            status,
            membership_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_status(&mut self, new_status: BookingStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }
}

/// A booking joined with the class as it looked when read.
/// `class` is `None` when the class has since been removed from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingWithClass {
    pub booking: Booking,
    pub class: Option<ClassSession>,
}

/// A stored record together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub record: T,
    pub version: i64,
}

impl<T> Versioned<T> {
    pub fn new(record: T, version: i64) -> Self {
        Self { record, version }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(max_spots: u32) -> ClassSession {
        ClassSession::new(
            "Spin",
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            max_spots,
        )
    }

    #[test]
    fn test_free_detection() {
        assert!(session(10).is_free());
        assert!(session(10).with_price(0).is_free());
        assert!(session(10).with_price(-5).is_free());
        assert!(!session(10).with_price(2000).is_free());
    }

    #[test]
    fn test_available_spots() {
        let mut class = session(10);
        class.booked_spots = 9;
        assert_eq!(class.available_spots(), 1);

        class.booked_spots = 10;
        assert_eq!(class.available_spots(), 0);
    }

    #[test]
    fn test_status_round_trip_and_terminal() {
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert!("paid".parse::<BookingStatus>().is_err());
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());

        let json = serde_json::to_string(&BookingStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
