use serde::{Deserialize, Serialize};
use crate::models::{Booking, ClassSession};

/// Pricing configuration for class checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Flat discount (in cents) for bookings that carry a membership reference
    pub membership_discount_cents: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            membership_discount_cents: 500,
        }
    }
}

/// What a booking costs at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub price_per_spot_cents: i64,
    pub spots: u32,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl Quote {
    pub fn is_free(&self) -> bool {
        self.total_cents == 0
    }
}

/// Price a booking against its class.
///
/// Free classes quote zero and never receive a discount. The membership
/// discount never takes the total below zero.
pub fn quote(config: &PricingConfig, class: &ClassSession, booking: &Booking) -> Quote {
    let price = class.price_cents.filter(|p| *p > 0).unwrap_or(0);
    let subtotal = price.saturating_mul(i64::from(booking.spots));

    let discount = if subtotal > 0 && booking.membership_id.is_some() {
        config.membership_discount_cents.clamp(0, subtotal)
    } else {
        0
    };

    Quote {
        price_per_spot_cents: price,
        spots: booking.spots,
        subtotal_cents: subtotal,
        discount_cents: discount,
        total_cents: subtotal - discount,
    }
}
