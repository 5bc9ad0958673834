//! Payment gateway integration.
//!
//! `GatewayClient` is the seam between the lifecycle service and the external
//! processor; `providers` holds the concrete Razorpay implementation and
//! `signature` the cryptographic verification of callbacks and webhooks.

pub mod providers;
pub mod signature;
pub mod traits;
pub mod types;

pub use providers::razorpay::{RazorpayClient, RazorpayConfig};
pub use traits::GatewayClient;

use thiserror::Error;

/// Failures surfaced by the gateway adapter.
///
/// `Unavailable` is transient and safe to retry; `Rejected` is a business
/// rejection and is not.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unavailable: {message}")]
    Unavailable { message: String },

    #[error("gateway rejected request: {message}")]
    Rejected { message: String },

    #[error("gateway has no record of {id}")]
    NotFound { id: String },
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable { .. })
    }
}
