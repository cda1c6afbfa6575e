use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use stride_booking::Reservation;
use stride_core::{Booking, BookingStatus, BookingWithClass, Quote, ReservationRequest};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub booking_id: Uuid,
    pub status: BookingStatus,
}

impl From<Booking> for StatusResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            status: booking.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpireResponse {
    pub expired: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/expire", post(expire_pending))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/quote", get(get_quote))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/members/{email}/bookings", get(list_member_bookings))
        .route("/v1/classes/{id}/bookings", get(list_class_bookings))
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = state.manager.reserve(req).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingWithClass>, AppError> {
    Ok(Json(state.manager.get_booking(booking_id).await?))
}

/// GET /v1/bookings/{id}/quote
async fn get_quote(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Quote>, AppError> {
    Ok(Json(state.manager.quote(booking_id).await?))
}

/// POST /v1/bookings/{id}/confirm
/// Called once checkout reports a successful payment
async fn confirm_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    let booking = state.manager.confirm_payment(booking_id).await?;
    Ok(Json(booking.into()))
}

/// POST /v1/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    let booking = state.manager.cancel_booking(booking_id).await?;
    Ok(Json(booking.into()))
}

/// POST /v1/bookings/expire
async fn expire_pending(State(state): State<AppState>) -> Result<Json<ExpireResponse>, AppError> {
    let expired = state.manager.expire_pending(state.pending_ttl).await?;
    Ok(Json(ExpireResponse { expired }))
}

/// GET /v1/members/{email}/bookings
async fn list_member_bookings(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<BookingWithClass>>, AppError> {
    Ok(Json(state.manager.list_confirmed_bookings(&email).await?))
}

/// GET /v1/classes/{id}/bookings
async fn list_class_bookings(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.manager.list_bookings_for_class(class_id).await?))
}
