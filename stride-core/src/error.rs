use serde::Serialize;

/// Failures reported by a `DocumentStore` adapter
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A record changed between read and commit; nothing was written
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be mapped back into the domain model
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("Only {available} spots remaining (requested {requested})")]
    CapacityExceeded {
        requested: u32,
        available: u32,
    },

    #[error("Class is full: {available} spots left, booking needs {requested}")]
    ClassFull {
        requested: u32,
        available: u32,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    #[error("Transaction did not commit after {attempts} attempts")]
    Transient {
        attempts: u32,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Expected outcomes the caller should show to the user as-is
    pub fn is_business(&self) -> bool {
        !matches!(self, BookingError::Transient { .. } | BookingError::Store(_))
    }

    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, BookingError::Store(StoreError::Conflict(_)))
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type BookingResult<T> = Result<T, BookingError>;
