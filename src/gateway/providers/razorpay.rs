//! Razorpay gateway client.
//!
//! Speaks the Razorpay Orders/Payments/Refunds HTTP API with basic auth.
//! Order creation and refunds are issued exactly once per call and rely on
//! the caller-supplied receipt for idempotency; payment fetches are read-only
//! and retried with exponential backoff on transient failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::gateway::traits::GatewayClient;
use crate::gateway::types::{
    CreateOrderRequest, GatewayPayment, GatewayPaymentStatus, OrderRef, RefundRef, RefundRequest,
};
use crate::gateway::GatewayError;

/// Razorpay client configuration.
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            base_url: "https://api.razorpay.com".to_string(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// HTTP client for the Razorpay API.
pub struct RazorpayClient {
    config: RazorpayConfig,
    client: Client,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    async fn send<T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, GatewayError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret));

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                GatewayError::Unavailable {
                    message: e.to_string(),
                }
            } else {
                GatewayError::Rejected {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| GatewayError::Rejected {
                message: format!("invalid gateway response: {}", e),
            })
        } else {
            Err(Self::error_from_response(status, &text))
        }
    }

    fn error_from_response(status: StatusCode, body: &str) -> GatewayError {
        let description = serde_json::from_str::<RazorpayErrorBody>(body)
            .map(|e| e.error.description)
            .unwrap_or_else(|_| format!("HTTP {}", status));

        if status == StatusCode::NOT_FOUND {
            GatewayError::NotFound { id: description }
        } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            GatewayError::Unavailable {
                message: description,
            }
        } else {
            GatewayError::Rejected {
                message: description,
            }
        }
    }
}

#[async_trait]
impl GatewayClient for RazorpayClient {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderRef, GatewayError> {
        info!(
            amount_minor = request.amount_minor,
            receipt = %request.receipt,
            "creating gateway order"
        );

        let payload = serde_json::json!({
            "amount": request.amount_minor,
            "currency": request.currency,
            "receipt": request.receipt,
            "notes": request.notes,
            "payment_capture": 1,
        });

        let order: RazorpayOrder = self
            .send(Method::POST, "/v1/orders", Some(&payload))
            .await?;

        info!(order_id = %order.id, "gateway order created");

        Ok(OrderRef {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    async fn fetch_payment(
        &self,
        gateway_payment_id: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let endpoint = format!("/v1/payments/{}", gateway_payment_id);

        // Read-only, so transient failures are retried here.
        let mut attempt = 0;
        let payment: RazorpayPayment = loop {
            match self.send(Method::GET, &endpoint, None).await {
                Ok(payment) => break payment,
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let backoff = 2_u64.pow(attempt);
                    warn!(
                        gateway_payment_id,
                        attempt = attempt + 1,
                        "payment fetch failed, retrying after {}s: {}",
                        backoff,
                        e
                    );
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        Ok(GatewayPayment {
            id: payment.id,
            order_id: payment.order_id,
            status: GatewayPaymentStatus::from_api(&payment.status),
            method: payment.method,
            amount_minor: payment.amount,
        })
    }

    async fn issue_refund(&self, request: RefundRequest) -> Result<RefundRef, GatewayError> {
        info!(
            gateway_payment_id = %request.gateway_payment_id,
            amount_minor = request.amount_minor,
            receipt = %request.receipt,
            "issuing gateway refund"
        );

        let mut payload = serde_json::json!({
            "amount": request.amount_minor,
            "receipt": request.receipt,
        });
        if let Some(notes) = &request.notes {
            payload["notes"] = serde_json::json!({ "reason": notes });
        }

        let endpoint = format!("/v1/payments/{}/refund", request.gateway_payment_id);
        let refund: RazorpayRefund = self.send(Method::POST, &endpoint, Some(&payload)).await?;

        info!(refund_id = %refund.id, "gateway refund issued");

        Ok(RefundRef {
            id: refund.id,
            amount_minor: refund.amount,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayPayment {
    id: String,
    amount: i64,
    status: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RazorpayRefund {
    id: String,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    description: String,
}
