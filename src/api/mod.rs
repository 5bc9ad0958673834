//! HTTP surface.

pub mod health;
pub mod payments;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::service::PaymentService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PaymentService>,
    /// Absent in tests that run against in-memory stores.
    pub pool: Option<PgPool>,
    pub environment: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/payments", get(payments::list_payments))
        .route("/payments/create", post(payments::create_payment))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/payments/methods", get(payments::payment_methods))
        .route("/payments/webhook", post(payments::webhook))
        .route("/payments/:payment_id", get(payments::get_payment))
        .route("/payments/:payment_id/refund", post(payments::refund_payment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
