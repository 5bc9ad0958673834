//! Storage traits the lifecycle service depends on.
//!
//! The Postgres implementations live beside this module; tests inject
//! in-memory substitutes through the same seams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::error::DatabaseError;
use crate::model::{Booking, Payment, PaymentStatus};

/// Fields written together with a status transition. `None` leaves the
/// column untouched.
#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub refund_amount: Option<i64>,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

/// The payment ledger. Rows are append-only: there is no delete, and the
/// only mutation is the compare-and-set `transition`.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new payment. The storage layer enforces at most one
    /// pending/paid payment per booking and reports a violation as
    /// `UniqueViolation`.
    async fn insert(&self, payment: Payment) -> Result<Payment, DatabaseError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>, DatabaseError>;

    async fn find_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, DatabaseError>;

    /// The pending or paid payment for a booking, if any.
    async fn find_active_for_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Payment>, DatabaseError>;

    /// User-scoped page of payments plus the total count for that filter.
    async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<PaymentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payment>, i64), DatabaseError>;

    /// Atomic compare-and-set status transition: a single conditional update
    /// keyed on (id, expected current status). Returns `None` when no row
    /// matched, i.e. the id is unknown or another request transitioned the
    /// payment first.
    async fn transition(
        &self,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        patch: PaymentPatch,
    ) -> Result<Option<Payment>, DatabaseError>;
}

/// The booking collaborator, as narrow as this engine needs it.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, DatabaseError>;

    /// Point the booking at its payment when checkout starts.
    async fn link_payment(
        &self,
        booking_id: &str,
        payment_id: &str,
        payment_status: PaymentStatus,
    ) -> Result<(), DatabaseError>;

    /// Project payment state onto the booking: mirror `payment_status` and,
    /// when `confirm` is set, flip the booking to confirmed. Idempotent; the
    /// write only touches rows whose mirror actually differs, and the return
    /// value reports whether anything changed.
    async fn apply_payment_state(
        &self,
        booking_id: &str,
        payment_status: PaymentStatus,
        confirm: bool,
    ) -> Result<bool, DatabaseError>;
}

/// Audit log of verified gateway notifications. Never drives control flow.
#[async_trait]
pub trait WebhookEventLog: Send + Sync {
    /// Record a verified event; returns the log entry id.
    async fn record(
        &self,
        event_type: &str,
        source: &str,
        payload: serde_json::Value,
    ) -> Result<String, DatabaseError>;

    async fn mark_processed(&self, event_id: &str) -> Result<(), DatabaseError>;

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DatabaseError>;
}
