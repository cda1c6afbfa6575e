use serde::Deserialize;
use uuid::Uuid;
use crate::error::{BookingError, BookingResult, FieldError};
use crate::models::Contact;

const MIN_NAME_CHARS: usize = 2;

/// Raw reservation input as submitted by a member
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub class_id: Uuid,
    pub spots: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub membership_id: Option<String>,
}

/// Reservation input that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReservation {
    pub class_id: Uuid,
    pub spots: u32,
    pub contact: Contact,
    pub membership_id: Option<String>,
}

impl ReservationRequest {
    /// Check every field and report all problems at once
    pub fn validate(self) -> BookingResult<ValidReservation> {
        let mut errors = Vec::new();

        let name = self.name.trim().to_string();
        if name.chars().count() < MIN_NAME_CHARS {
            errors.push(FieldError::new("name", "Name must be at least 2 characters."));
        }

        let email = normalize_email(&self.email);
        if !is_well_formed_email(&email) {
            errors.push(FieldError::new("email", "Invalid email address."));
        }

        let spots = match u32::try_from(self.spots) {
            Ok(n) if n >= 1 => n,
            _ => {
                errors.push(FieldError::new("spots", "You must book at least 1 spot."));
                0
            }
        };

        if !errors.is_empty() {
            return Err(BookingError::Validation(errors));
        }

        let membership_id = self
            .membership_id
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(ValidReservation {
            class_id: self.class_id,
            spots,
            contact: Contact::new(name, email),
            membership_id,
        })
    }
}

/// Emails are matched case-insensitively, so they are stored lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// local@domain.tld with no whitespace and a dotted domain
pub fn is_well_formed_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}
