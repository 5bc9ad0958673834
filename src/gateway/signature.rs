//! HMAC-SHA256 proof of authenticity for gateway traffic.
//!
//! Two independent secrets are in play: the checkout secret signs the
//! `order_id|payment_id` pair the client hands back after checkout, and the
//! webhook secret signs the raw body of server-to-server notifications. A
//! payload verified under one secret proves nothing under the other.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The two signing secrets, configured independently.
#[derive(Debug, Clone)]
pub struct SignatureSecrets {
    pub checkout_secret: String,
    pub webhook_secret: String,
}

/// Hex-encoded HMAC-SHA256 digest of `payload` under `secret`.
pub fn compute_hmac(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the post-checkout callback signature over the canonical
/// `"{order_id}|{gateway_payment_id}"` string.
pub fn verify_callback(
    secret: &str,
    order_id: &str,
    gateway_payment_id: &str,
    provided: &str,
) -> bool {
    let canonical = format!("{}|{}", order_id, gateway_payment_id);
    let expected = compute_hmac(secret, canonical.as_bytes());
    constant_time_eq(expected.as_bytes(), provided.trim().as_bytes())
}

/// Verify a webhook signature over the raw request body.
pub fn verify_webhook(secret: &str, raw_body: &[u8], provided: &str) -> bool {
    let expected = compute_hmac(secret, raw_body);
    constant_time_eq(expected.as_bytes(), provided.trim().as_bytes())
}

// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
