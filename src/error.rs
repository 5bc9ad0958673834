//! Service-level error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::database::error::DatabaseError;
use crate::gateway::GatewayError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate payment, already verified, already refunded, wrong state.
    #[error("{0}")]
    Conflict(String),

    #[error("invalid payment signature")]
    InvalidSignature,

    /// The gateway's authoritative record does not show captured funds.
    #[error("payment {0} has not been captured by the gateway")]
    PaymentNotCaptured(String),

    #[error("{0}")]
    InvalidAmount(String),

    #[error("refund of {requested} exceeds the eligible amount {eligible}")]
    RefundOverPolicy { requested: i64, eligible: i64 },

    #[error("missing or invalid identity")]
    Unauthorized,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::PaymentNotCaptured(_) => StatusCode::CONFLICT,
            AppError::InvalidSignature
            | AppError::InvalidAmount(_)
            | AppError::RefundOverPolicy { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidSignature => "invalid_signature",
            AppError::PaymentNotCaptured(_) => "payment_not_captured",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::RefundOverPolicy { .. } => "refund_over_policy",
            AppError::Unauthorized => "unauthorized",
            AppError::Gateway(_) => "gateway_error",
            AppError::Database(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}
