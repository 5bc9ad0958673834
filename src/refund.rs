//! Cancellation refund policy.
//!
//! Maps (amount, time remaining until the booking starts, service type) to
//! the maximum refundable amount. Pure so callers control the clock.

use chrono::{DateTime, Utc};

use crate::model::ServiceType;

/// Maximum amount refundable for a booking cancelled at `now`.
///
/// Pooling rides refund 100% up to 24h before start and 50% up to 12h;
/// rentals use 48h and 24h windows. Inside the final window nothing is
/// refundable.
pub fn eligible_refund(
    total_amount: i64,
    booking_start: DateTime<Utc>,
    service_type: ServiceType,
    now: DateTime<Utc>,
) -> i64 {
    let hours_remaining = booking_start.signed_duration_since(now).num_hours();

    let percent = match service_type {
        ServiceType::Pooling => {
            if hours_remaining >= 24 {
                100
            } else if hours_remaining >= 12 {
                50
            } else {
                0
            }
        }
        ServiceType::Rental => {
            if hours_remaining >= 48 {
                100
            } else if hours_remaining >= 24 {
                50
            } else {
                0
            }
        }
    };

    total_amount * percent / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn start_in(hours: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now + Duration::hours(hours), now)
    }

    #[test]
    fn pooling_windows() {
        let (start, now) = start_in(30);
        assert_eq!(eligible_refund(1000, start, ServiceType::Pooling, now), 1000);

        let (start, now) = start_in(13);
        assert_eq!(eligible_refund(1000, start, ServiceType::Pooling, now), 500);

        let (start, now) = start_in(1);
        assert_eq!(eligible_refund(1000, start, ServiceType::Pooling, now), 0);
    }

    #[test]
    fn rental_windows() {
        let (start, now) = start_in(72);
        assert_eq!(eligible_refund(1000, start, ServiceType::Rental, now), 1000);

        let (start, now) = start_in(30);
        assert_eq!(eligible_refund(1000, start, ServiceType::Rental, now), 500);

        let (start, now) = start_in(5);
        assert_eq!(eligible_refund(1000, start, ServiceType::Rental, now), 0);
    }

    #[test]
    fn boundary_hours_are_inclusive() {
        let (start, now) = start_in(24);
        assert_eq!(eligible_refund(1000, start, ServiceType::Pooling, now), 1000);
        assert_eq!(eligible_refund(1000, start, ServiceType::Rental, now), 500);

        let (start, now) = start_in(12);
        assert_eq!(eligible_refund(1000, start, ServiceType::Pooling, now), 500);
    }

    #[test]
    fn booking_already_started_refunds_nothing() {
        let now = Utc::now();
        let start = now - Duration::hours(2);
        assert_eq!(eligible_refund(1000, start, ServiceType::Pooling, now), 0);
        assert_eq!(eligible_refund(1000, start, ServiceType::Rental, now), 0);
    }
}
