use std::sync::Arc;
use stride_booking::BookingManager;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BookingManager>,
    /// Pending bookings older than this are cancelled by the expiry endpoint
    pub pending_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(manager: BookingManager, pending_ttl: chrono::Duration) -> Self {
        Self {
            manager: Arc::new(manager),
            pending_ttl,
        }
    }
}
