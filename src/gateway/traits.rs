//! Gateway client trait definition.

use async_trait::async_trait;

use crate::gateway::types::{
    CreateOrderRequest, GatewayPayment, OrderRef, RefundRef, RefundRequest,
};
use crate::gateway::GatewayError;

/// Unified interface to the external payment gateway.
///
/// The lifecycle service receives this as an injected `Arc<dyn GatewayClient>`
/// so tests can substitute a fake. All calls carry bounded timeouts; none
/// block indefinitely.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Create a gateway order for the given amount in minor units.
    ///
    /// Not retried internally; the `receipt` in the request dedups
    /// caller-side retries.
    async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderRef, GatewayError>;

    /// Fetch the authoritative state of a payment. Read-only and safe to
    /// retry, which the implementation does on transient failures.
    async fn fetch_payment(&self, gateway_payment_id: &str)
        -> Result<GatewayPayment, GatewayError>;

    /// Refund part or all of a captured payment.
    ///
    /// Not retried internally; the `receipt` in the request dedups
    /// caller-side retries.
    async fn issue_refund(&self, request: RefundRequest) -> Result<RefundRef, GatewayError>;
}
