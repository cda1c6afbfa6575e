use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stride_core::{BookingError, FieldError};

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    BadRequest(String),
    NotFoundError(String),
    ConflictError(String),
    Unavailable(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, fields) = match self {
            AppError::ValidationError(fields) => (
                StatusCode::BAD_REQUEST,
                "Validation failed. Please check your input.".to_string(),
                Some(fields),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::Unavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Please try again shortly".to_string(), None)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let body = match fields {
            Some(fields) => Json(json!({ "error": error_message, "fields": fields })),
            None => Json(json!({ "error": error_message })),
        };

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(fields) => AppError::ValidationError(fields),
            BookingError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            BookingError::CapacityExceeded { .. }
            | BookingError::ClassFull { .. }
            | BookingError::InvalidTransition { .. } => AppError::ConflictError(err.to_string()),
            BookingError::Transient { .. } => AppError::Unavailable(err.to_string()),
            BookingError::Store(_) => AppError::InternalServerError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_core::StoreError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (BookingError::Validation(vec![]), StatusCode::BAD_REQUEST),
            (BookingError::NotFound("Booking x".into()), StatusCode::NOT_FOUND),
            (BookingError::CapacityExceeded { requested: 2, available: 1 }, StatusCode::CONFLICT),
            (BookingError::ClassFull { requested: 1, available: 0 }, StatusCode::CONFLICT),
            (BookingError::Transient { attempts: 5 }, StatusCode::SERVICE_UNAVAILABLE),
            (StoreError::Corrupt("bad row".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
