//! Wire types shared between the gateway adapter and its callers.

use serde::{Deserialize, Serialize};

/// Request to open a gateway order before the user pays.
///
/// `receipt` is derived from the local payment id and doubles as the
/// idempotency key: retrying the same receipt never mints a second order.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: serde_json::Value,
}

/// Gateway-side order reference returned to the checkout UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// Authoritative gateway payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Created,
    Authorized,
    Captured,
    Refunded,
    Failed,
    Unknown,
}

impl GatewayPaymentStatus {
    pub fn from_api(status: &str) -> Self {
        match status {
            "created" => GatewayPaymentStatus::Created,
            "authorized" => GatewayPaymentStatus::Authorized,
            "captured" => GatewayPaymentStatus::Captured,
            "refunded" => GatewayPaymentStatus::Refunded,
            "failed" => GatewayPaymentStatus::Failed,
            _ => GatewayPaymentStatus::Unknown,
        }
    }

    /// Only a captured payment proves funds were collected.
    pub fn is_captured(self) -> bool {
        matches!(self, GatewayPaymentStatus::Captured)
    }
}

/// A payment record as reported by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub id: String,
    pub order_id: Option<String>,
    pub status: GatewayPaymentStatus,
    pub method: Option<String>,
    pub amount_minor: i64,
}

/// Request to return captured funds.
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub gateway_payment_id: String,
    pub amount_minor: i64,
    /// Idempotency key derived from the local payment id.
    pub receipt: String,
    pub notes: Option<String>,
}

/// Gateway-side refund reference.
#[derive(Debug, Clone)]
pub struct RefundRef {
    pub id: String,
    pub amount_minor: i64,
}

/// Envelope of a gateway webhook notification.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookPaymentWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPaymentWrapper {
    pub entity: WebhookPaymentEntity,
}

/// The payment entity carried inside capture/failure notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub status: Option<String>,
    pub method: Option<String>,
    pub amount: Option<i64>,
    pub error_description: Option<String>,
}
