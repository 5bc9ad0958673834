//! Postgres-backed payment ledger.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::error::DatabaseError;
use crate::database::repository::{PaymentPatch, PaymentStore};
use crate::model::{Payment, PaymentStatus};

const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, amount, platform_fee, total_amount, \
     payment_method, status, gateway_order_id, gateway_payment_id, gateway_signature, \
     transaction_id, failure_reason, refund_amount, refund_reason, refunded_at, metadata, \
     created_at, updated_at";

/// Repository for payment rows. The one-active-payment-per-booking invariant
/// is backed by a partial unique index on (booking_id) where status is
/// pending or paid; violations surface as `UniqueViolation`.
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<Payment, DatabaseError> {
        let sql = format!(
            "INSERT INTO payments ({PAYMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19) \
             RETURNING {PAYMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(&payment.id)
            .bind(&payment.booking_id)
            .bind(&payment.user_id)
            .bind(payment.amount)
            .bind(payment.platform_fee)
            .bind(payment.total_amount)
            .bind(payment.payment_method)
            .bind(payment.status)
            .bind(&payment.gateway_order_id)
            .bind(&payment.gateway_payment_id)
            .bind(&payment.gateway_signature)
            .bind(&payment.transaction_id)
            .bind(&payment.failure_reason)
            .bind(payment.refund_amount)
            .bind(&payment.refund_reason)
            .bind(payment.refunded_at)
            .bind(&payment.metadata)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>, DatabaseError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, DatabaseError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_order_id = $1");
        sqlx::query_as::<_, Payment>(&sql)
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn find_active_for_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Payment>, DatabaseError> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE booking_id = $1 AND status IN ('pending', 'paid')"
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<PaymentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payment>, i64), DatabaseError> {
        let (payments, total) = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {PAYMENT_COLUMNS} FROM payments \
                     WHERE user_id = $1 AND status = $2 \
                     ORDER BY created_at DESC LIMIT $3 OFFSET $4"
                );
                let payments = sqlx::query_as::<_, Payment>(&sql)
                    .bind(user_id)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(DatabaseError::from_sqlx)?;
                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM payments WHERE user_id = $1 AND status = $2",
                )
                .bind(user_id)
                .bind(status)
                .fetch_one(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;
                (payments, total)
            }
            None => {
                let sql = format!(
                    "SELECT {PAYMENT_COLUMNS} FROM payments \
                     WHERE user_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                );
                let payments = sqlx::query_as::<_, Payment>(&sql)
                    .bind(user_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(DatabaseError::from_sqlx)?;
                let total = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM payments WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(DatabaseError::from_sqlx)?;
                (payments, total)
            }
        };

        Ok((payments, total))
    }

    async fn transition(
        &self,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        patch: PaymentPatch,
    ) -> Result<Option<Payment>, DatabaseError> {
        // Single conditional update keyed on (id, expected status); a lost
        // race matches zero rows instead of clobbering a newer state.
        let sql = format!(
            "UPDATE payments SET \
                status = $3, \
                gateway_payment_id = COALESCE($4, gateway_payment_id), \
                gateway_signature = COALESCE($5, gateway_signature), \
                transaction_id = COALESCE($6, transaction_id), \
                failure_reason = COALESCE($7, failure_reason), \
                refund_amount = COALESCE($8, refund_amount), \
                refund_reason = COALESCE($9, refund_reason), \
                refunded_at = COALESCE($10, refunded_at), \
                metadata = COALESCE($11, metadata), \
                updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {PAYMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(&patch.gateway_payment_id)
            .bind(&patch.gateway_signature)
            .bind(&patch.transaction_id)
            .bind(&patch.failure_reason)
            .bind(patch.refund_amount)
            .bind(&patch.refund_reason)
            .bind(patch.refunded_at)
            .bind(&patch.metadata)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)
    }
}
