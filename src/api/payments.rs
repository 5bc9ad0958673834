//! Payment endpoints.
//!
//! Identity arrives from the upstream auth middleware as an `x-user-id`
//! header; the webhook endpoint is the one unauthenticated entry point and
//! authenticates by signature instead.

use axum::async_trait;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::gateway::types::{OrderRef, WebhookEnvelope};
use crate::model::{Payment, PaymentMethod, PaymentStatus};

const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Authenticated caller identity, extracted from the `x-user-id` header the
/// auth middleware injects.
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| AuthUser(v.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub booking_id: String,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub payment: Payment,
    pub gateway_order: OrderRef,
}

pub async fn create_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<CreatePaymentResponse>)> {
    let (payment, gateway_order) = state
        .service
        .create_payment(&user_id, &request.booking_id, request.payment_method)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            payment,
            gateway_order,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: Payment,
}

pub async fn verify_payment(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Json(request): Json<VerifyPaymentRequest>,
) -> AppResult<Json<PaymentResponse>> {
    let payment = state
        .service
        .verify_payment(
            &request.order_id,
            &request.gateway_payment_id,
            &request.signature,
        )
        .await?;

    Ok(Json(PaymentResponse { payment }))
}

pub async fn get_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(payment_id): Path<String>,
) -> AppResult<Json<PaymentResponse>> {
    let payment = state.service.get_payment(&user_id, &payment_id).await?;
    Ok(Json(PaymentResponse { payment }))
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub status: Option<PaymentStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListPaymentsResponse {
    pub payments: Vec<Payment>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

pub async fn list_payments(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListPaymentsQuery>,
) -> AppResult<Json<ListPaymentsResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (payments, total) = state
        .service
        .list_payments(&user_id, query.status, page, limit)
        .await?;

    Ok(Json(ListPaymentsResponse {
        payments,
        total,
        page,
        limit,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentRequest {
    pub refund_amount: Option<i64>,
    pub reason: Option<String>,
    #[serde(default)]
    pub policy_override: bool,
}

pub async fn refund_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(payment_id): Path<String>,
    Json(request): Json<RefundPaymentRequest>,
) -> AppResult<Json<PaymentResponse>> {
    let payment = state
        .service
        .process_refund(
            &user_id,
            &payment_id,
            request.refund_amount,
            request.reason,
            request.policy_override,
        )
        .await?;

    Ok(Json(PaymentResponse { payment }))
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodInfo {
    pub id: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PaymentMethodsResponse {
    pub methods: Vec<PaymentMethodInfo>,
}

/// Static list of supported checkout methods. Unauthenticated.
pub async fn payment_methods() -> Json<PaymentMethodsResponse> {
    let methods = PaymentMethod::all()
        .iter()
        .map(|m| PaymentMethodInfo {
            id: m.as_str(),
            label: m.label(),
        })
        .collect();

    Json(PaymentMethodsResponse { methods })
}

/// Gateway notification entry point.
///
/// Signature failures are authentication failures: 400, no side effects.
/// Processing failures are 500 so the gateway redelivers. Everything else,
/// including idempotent no-ops and unknown events, is a 200 so the gateway
/// does not retry-storm.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(provided) = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("webhook missing signature header");
        return webhook_rejection("missing signature header");
    };

    if !state.service.verify_webhook_signature(body.as_bytes(), provided) {
        warn!("webhook signature mismatch");
        return webhook_rejection("invalid signature");
    }

    let raw: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("webhook body is not valid JSON: {}", e);
            return webhook_rejection("malformed body");
        }
    };
    let envelope: WebhookEnvelope = match serde_json::from_value(raw.clone()) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("webhook envelope malformed: {}", e);
            return webhook_rejection("malformed envelope");
        }
    };

    match state.service.reconcile_webhook_event(envelope, raw).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => {
            error!("webhook processing failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false })),
            )
                .into_response()
        }
    }
}

fn webhook_rejection(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response()
}
