//! Core domain entities for the payment lifecycle engine.
//!
//! `Payment` is owned exclusively by this engine and forms an append-only
//! audit trail; `Booking` belongs to an external collaborator and is only
//! read, linked, and mirrored here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// All amounts are whole rupees; the gateway speaks paise.
pub const MINOR_UNITS_PER_RUPEE: i64 = 100;

/// Currency is fixed for this deployment.
pub const CURRENCY: &str = "INR";

/// Convert a rupee amount to gateway minor units (paise).
pub fn to_minor_units(rupees: i64) -> i64 {
    rupees * MINOR_UNITS_PER_RUPEE
}

/// Convert gateway minor units back to whole rupees.
pub fn from_minor_units(minor: i64) -> i64 {
    minor / MINOR_UNITS_PER_RUPEE
}

/// Payment methods offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Card,
    Wallet,
    NetBanking,
    OfflineCash,
}

impl PaymentMethod {
    pub fn all() -> [PaymentMethod; 5] {
        [
            PaymentMethod::Upi,
            PaymentMethod::Card,
            PaymentMethod::Wallet,
            PaymentMethod::NetBanking,
            PaymentMethod::OfflineCash,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Upi => "upi",
            PaymentMethod::Card => "card",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::NetBanking => "net_banking",
            PaymentMethod::OfflineCash => "offline_cash",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Card => "Credit / Debit Card",
            PaymentMethod::Wallet => "Wallet",
            PaymentMethod::NetBanking => "Net Banking",
            PaymentMethod::OfflineCash => "Cash",
        }
    }
}

/// Lifecycle state of a payment. Transitions only move forward:
/// pending -> paid, pending -> failed, paid -> refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Whether the forward-only state machine permits this transition.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// A single payment attempt against a booking.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "paymentId")]
    pub id: String,
    pub booking_id: String,
    pub user_id: String,
    pub amount: i64,
    pub platform_fee: i64,
    pub total_amount: i64,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub refund_amount: Option<i64>,
    pub refund_reason: Option<String>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Build a fresh pending payment for a booking. The gateway order must
    /// already exist; a payment row is never persisted without one.
    pub fn new(
        id: String,
        booking: &Booking,
        payment_method: PaymentMethod,
        gateway_order_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            booking_id: booking.id.clone(),
            user_id: booking.user_id.clone(),
            amount: booking.amount,
            platform_fee: booking.platform_fee,
            total_amount: booking.total_amount,
            payment_method,
            status: PaymentStatus::Pending,
            gateway_order_id,
            gateway_payment_id: None,
            gateway_signature: None,
            transaction_id: None,
            failure_reason: None,
            refund_amount: None,
            refund_reason: None,
            refunded_at: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Service types carry different cancellation windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "service_type", rename_all = "lowercase")]
pub enum ServiceType {
    Pooling,
    Rental,
}

/// Booking lifecycle as far as this engine cares: it flips a booking to
/// `Confirmed` when its payment is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// The slice of the Booking record this engine consumes and mirrors into.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "bookingId")]
    pub id: String,
    pub user_id: String,
    pub amount: i64,
    pub platform_fee: i64,
    pub total_amount: i64,
    pub service_type: ServiceType,
    pub status: BookingStatus,
    pub start_time: DateTime<Utc>,
    pub payment_id: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_unit_round_trip_is_exact_for_whole_rupees() {
        for amount in [0, 1, 450, 999, 100_000] {
            assert_eq!(from_minor_units(to_minor_units(amount)), amount);
        }
        assert_eq!(to_minor_units(450), 45_000);
    }

    #[test]
    fn status_machine_only_moves_forward() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Failed));
        assert!(Paid.can_transition_to(Refunded));

        assert!(!Paid.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Paid));
        assert!(!Refunded.can_transition_to(Paid));
        assert!(!Pending.can_transition_to(Refunded));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states() {
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Refunded.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Paid.is_terminal());
    }
}
