//! Postgres access to the booking collaborator.
//!
//! Bookings are owned elsewhere; this engine only reads them, links the
//! active payment, and mirrors payment state.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::error::DatabaseError;
use crate::database::repository::BookingStore;
use crate::model::{Booking, PaymentStatus};

const BOOKING_COLUMNS: &str = "id, user_id, amount, platform_fee, total_amount, service_type, \
     status, start_time, payment_id, payment_status, created_at, updated_at";

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, DatabaseError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn link_payment(
        &self,
        booking_id: &str,
        payment_id: &str,
        payment_status: PaymentStatus,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE bookings SET payment_id = $2, payment_status = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(booking_id)
        .bind(payment_id)
        .bind(payment_status)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    async fn apply_payment_state(
        &self,
        booking_id: &str,
        payment_status: PaymentStatus,
        confirm: bool,
    ) -> Result<bool, DatabaseError> {
        // The guard clause makes re-application a no-op, so redelivered
        // webhooks produce at most one effective booking update.
        let result = sqlx::query(
            "UPDATE bookings SET \
                payment_status = $2, \
                status = CASE WHEN $3 THEN 'confirmed'::booking_status ELSE status END, \
                updated_at = NOW() \
             WHERE id = $1 \
               AND (payment_status IS DISTINCT FROM $2 \
                    OR ($3 AND status <> 'confirmed'))",
        )
        .bind(booking_id)
        .bind(payment_status)
        .bind(confirm)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}
