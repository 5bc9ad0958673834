//! Payment lifecycle orchestration.
//!
//! Owns every Payment mutation and keeps the dependent Booking record
//! consistent. All collaborators come in through constructor injection so
//! tests can substitute fakes at each seam.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

use crate::database::repository::{
    BookingStore, PaymentPatch, PaymentStore, WebhookEventLog,
};
use crate::error::{AppError, AppResult};
use crate::gateway::signature::{self, SignatureSecrets};
use crate::gateway::types::{
    CreateOrderRequest, OrderRef, RefundRequest, WebhookEnvelope, WebhookPaymentEntity,
};
use crate::gateway::GatewayClient;
use crate::model::{self, Booking, Payment, PaymentMethod, PaymentStatus};
use crate::refund::eligible_refund;

const WEBHOOK_SOURCE: &str = "razorpay";
const EVENT_PAYMENT_CAPTURED: &str = "payment.captured";
const EVENT_PAYMENT_FAILED: &str = "payment.failed";

/// What a webhook delivery amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event transitioned a payment.
    Applied,
    /// The payment was already past this event; nothing to do.
    Noop,
    /// Unrecognized or unmatchable event, acknowledged and dropped.
    Ignored,
}

pub struct PaymentService {
    gateway: Arc<dyn GatewayClient>,
    payments: Arc<dyn PaymentStore>,
    bookings: Arc<dyn BookingStore>,
    webhook_log: Arc<dyn WebhookEventLog>,
    secrets: SignatureSecrets,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        payments: Arc<dyn PaymentStore>,
        bookings: Arc<dyn BookingStore>,
        webhook_log: Arc<dyn WebhookEventLog>,
        secrets: SignatureSecrets,
    ) -> Self {
        Self {
            gateway,
            payments,
            bookings,
            webhook_log,
            secrets,
        }
    }

    /// Start checkout for a booking: create the gateway order, then persist
    /// the pending payment and link it to the booking.
    ///
    /// The gateway call comes first so a gateway failure never leaves an
    /// orphan pending payment without a gateway order id.
    pub async fn create_payment(
        &self,
        user_id: &str,
        booking_id: &str,
        payment_method: PaymentMethod,
    ) -> AppResult<(Payment, OrderRef)> {
        let booking = self.owned_booking(booking_id, user_id).await?;

        if booking.total_amount != booking.amount + booking.platform_fee {
            return Err(AppError::InvalidAmount(format!(
                "booking total {} does not equal amount {} plus fee {}",
                booking.total_amount, booking.amount, booking.platform_fee
            )));
        }

        if let Some(existing) = self.payments.find_active_for_booking(booking_id).await? {
            return Err(AppError::Conflict(format!(
                "booking already has a {} payment",
                existing.status.as_str()
            )));
        }

        let payment_id = Payment::generate_id();
        let order = self
            .gateway
            .create_order(CreateOrderRequest {
                amount_minor: model::to_minor_units(booking.total_amount),
                currency: model::CURRENCY.to_string(),
                receipt: payment_id.clone(),
                notes: json!({
                    "booking_id": booking.id,
                    "user_id": booking.user_id,
                }),
            })
            .await?;

        let payment = Payment::new(payment_id, &booking, payment_method, order.id.clone());
        let payment = self.payments.insert(payment).await.map_err(|e| {
            // Two concurrent checkouts can both pass the guard above; the
            // partial unique index is the last word.
            if e.is_unique_violation() {
                AppError::Conflict("booking already has an active payment".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        self.bookings
            .link_payment(&booking.id, &payment.id, PaymentStatus::Pending)
            .await?;

        info!(
            payment_id = %payment.id,
            booking_id = %booking.id,
            gateway_order_id = %payment.gateway_order_id,
            "payment created"
        );

        Ok((payment, order))
    }

    /// Verify a client-asserted checkout result.
    ///
    /// The signature proves the client did not tamper with the ids, and the
    /// gateway fetch proves funds were actually captured; the client's
    /// assertion alone is never trusted.
    pub async fn verify_payment(
        &self,
        order_id: &str,
        gateway_payment_id: &str,
        provided_signature: &str,
    ) -> AppResult<Payment> {
        if !signature::verify_callback(
            &self.secrets.checkout_secret,
            order_id,
            gateway_payment_id,
            provided_signature,
        ) {
            warn!(order_id, "checkout callback signature mismatch");
            return Err(AppError::InvalidSignature);
        }

        let payment = self
            .payments
            .find_by_gateway_order(order_id)
            .await?
            .ok_or(AppError::NotFound("payment"))?;

        match payment.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Paid | PaymentStatus::Refunded => {
                return Err(AppError::Conflict("payment already verified".to_string()))
            }
            PaymentStatus::Failed => {
                return Err(AppError::Conflict("payment already failed".to_string()))
            }
        }

        let gateway_payment = self.gateway.fetch_payment(gateway_payment_id).await?;
        if !gateway_payment.status.is_captured() {
            return Err(AppError::PaymentNotCaptured(gateway_payment_id.to_string()));
        }

        let patch = PaymentPatch {
            gateway_payment_id: Some(gateway_payment.id.clone()),
            gateway_signature: Some(provided_signature.to_string()),
            transaction_id: Some(gateway_payment.id.clone()),
            metadata: Some(json!({
                "verified_via": "client_callback",
                "gateway_method": gateway_payment.method,
            })),
            ..Default::default()
        };

        let updated = self
            .payments
            .transition(&payment.id, PaymentStatus::Pending, PaymentStatus::Paid, patch)
            .await?
            .ok_or_else(|| {
                // Lost the race against a webhook capture for the same order.
                AppError::Conflict("payment state changed concurrently".to_string())
            })?;

        self.bookings
            .apply_payment_state(&updated.booking_id, PaymentStatus::Paid, true)
            .await?;

        info!(payment_id = %updated.id, "payment verified and captured");
        Ok(updated)
    }

    /// Whether a webhook body/signature pair is authentic. Exposed for the
    /// endpoint, which must reject before any processing happens.
    pub fn verify_webhook_signature(&self, raw_body: &[u8], provided: &str) -> bool {
        signature::verify_webhook(&self.secrets.webhook_secret, raw_body, provided)
    }

    /// Reconcile a gateway notification whose signature has already been
    /// verified by the endpoint.
    ///
    /// Redeliveries and out-of-order duplicates are expected: applying the
    /// same capture event any number of times yields the same final state
    /// and at most one effective booking update.
    pub async fn reconcile_webhook_event(
        &self,
        envelope: WebhookEnvelope,
        raw_payload: serde_json::Value,
    ) -> AppResult<WebhookOutcome> {
        let event_id = self
            .webhook_log
            .record(&envelope.event, WEBHOOK_SOURCE, raw_payload)
            .await?;

        let result = match envelope.event.as_str() {
            EVENT_PAYMENT_CAPTURED => match Self::entity(&envelope) {
                Some(entity) => self.apply_capture(entity).await,
                None => {
                    warn!(event = %envelope.event, "capture event without payment entity");
                    Ok(WebhookOutcome::Ignored)
                }
            },
            EVENT_PAYMENT_FAILED => match Self::entity(&envelope) {
                Some(entity) => self.apply_failure(entity).await,
                None => {
                    warn!(event = %envelope.event, "failure event without payment entity");
                    Ok(WebhookOutcome::Ignored)
                }
            },
            other => {
                // Forward compatibility: acknowledge events we do not handle.
                info!(event = %other, "ignoring unhandled webhook event");
                Ok(WebhookOutcome::Ignored)
            }
        };

        match &result {
            Ok(_) => self.webhook_log.mark_processed(&event_id).await?,
            Err(e) => {
                if let Err(log_err) = self.webhook_log.mark_failed(&event_id, &e.to_string()).await
                {
                    warn!(event_id = %event_id, "failed to record webhook failure: {}", log_err);
                }
            }
        }

        result
    }

    fn entity(envelope: &WebhookEnvelope) -> Option<&WebhookPaymentEntity> {
        envelope.payload.payment.as_ref().map(|p| &p.entity)
    }

    async fn apply_capture(&self, entity: &WebhookPaymentEntity) -> AppResult<WebhookOutcome> {
        let Some(order_id) = entity.order_id.as_deref() else {
            warn!(gateway_payment_id = %entity.id, "capture event without order id");
            return Ok(WebhookOutcome::Ignored);
        };

        let Some(payment) = self.payments.find_by_gateway_order(order_id).await? else {
            warn!(order_id, "capture event for unknown order");
            return Ok(WebhookOutcome::Ignored);
        };

        match payment.status {
            PaymentStatus::Pending => {
                let patch = PaymentPatch {
                    gateway_payment_id: Some(entity.id.clone()),
                    transaction_id: Some(entity.id.clone()),
                    metadata: Some(json!({
                        "verified_via": "webhook",
                        "gateway_method": entity.method,
                    })),
                    ..Default::default()
                };

                match self
                    .payments
                    .transition(&payment.id, PaymentStatus::Pending, PaymentStatus::Paid, patch)
                    .await?
                {
                    Some(updated) => {
                        self.bookings
                            .apply_payment_state(&updated.booking_id, PaymentStatus::Paid, true)
                            .await?;
                        info!(payment_id = %updated.id, "payment captured via webhook");
                        Ok(WebhookOutcome::Applied)
                    }
                    None => {
                        // Raced a concurrent capture; make sure the booking
                        // projection still lands.
                        self.resync_paid_booking(&payment.booking_id).await?;
                        Ok(WebhookOutcome::Noop)
                    }
                }
            }
            PaymentStatus::Paid => {
                // Duplicate delivery. Re-derive the booking projection in
                // case a crash separated the payment and booking writes.
                self.resync_paid_booking(&payment.booking_id).await?;
                Ok(WebhookOutcome::Noop)
            }
            PaymentStatus::Failed | PaymentStatus::Refunded => {
                warn!(
                    payment_id = %payment.id,
                    status = payment.status.as_str(),
                    "capture event for terminal payment"
                );
                Ok(WebhookOutcome::Noop)
            }
        }
    }

    async fn resync_paid_booking(&self, booking_id: &str) -> AppResult<()> {
        let changed = self
            .bookings
            .apply_payment_state(booking_id, PaymentStatus::Paid, true)
            .await?;
        if changed {
            info!(booking_id, "reconciled stale booking from payment state");
        }
        Ok(())
    }

    async fn apply_failure(&self, entity: &WebhookPaymentEntity) -> AppResult<WebhookOutcome> {
        let Some(order_id) = entity.order_id.as_deref() else {
            warn!(gateway_payment_id = %entity.id, "failure event without order id");
            return Ok(WebhookOutcome::Ignored);
        };

        let Some(payment) = self.payments.find_by_gateway_order(order_id).await? else {
            warn!(order_id, "failure event for unknown order");
            return Ok(WebhookOutcome::Ignored);
        };

        if payment.status != PaymentStatus::Pending {
            return Ok(WebhookOutcome::Noop);
        }

        let patch = PaymentPatch {
            failure_reason: Some(
                entity
                    .error_description
                    .clone()
                    .unwrap_or_else(|| "payment failed at gateway".to_string()),
            ),
            ..Default::default()
        };

        match self
            .payments
            .transition(&payment.id, PaymentStatus::Pending, PaymentStatus::Failed, patch)
            .await?
        {
            Some(updated) => {
                self.bookings
                    .apply_payment_state(&updated.booking_id, PaymentStatus::Failed, false)
                    .await?;
                info!(payment_id = %updated.id, "payment failed via webhook");
                Ok(WebhookOutcome::Applied)
            }
            None => Ok(WebhookOutcome::Noop),
        }
    }

    /// Refund a captured payment, bounded by the cancellation policy unless
    /// the caller carries an authorized override.
    pub async fn process_refund(
        &self,
        user_id: &str,
        payment_id: &str,
        requested_amount: Option<i64>,
        reason: Option<String>,
        policy_override: bool,
    ) -> AppResult<Payment> {
        let payment = self
            .payments
            .find_by_id(payment_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or(AppError::NotFound("payment"))?;

        match payment.status {
            PaymentStatus::Paid => {}
            PaymentStatus::Refunded => {
                return Err(AppError::Conflict("payment already refunded".to_string()))
            }
            PaymentStatus::Pending | PaymentStatus::Failed => {
                return Err(AppError::Conflict("payment is not paid".to_string()))
            }
        }

        let gateway_payment_id = payment
            .gateway_payment_id
            .clone()
            .ok_or_else(|| AppError::Conflict("payment has no gateway capture".to_string()))?;

        let refund_amount = requested_amount.unwrap_or(payment.total_amount);
        if refund_amount <= 0 || refund_amount > payment.total_amount {
            return Err(AppError::InvalidAmount(format!(
                "refund amount {} must be between 1 and {}",
                refund_amount, payment.total_amount
            )));
        }

        let booking = self
            .bookings
            .find_by_id(&payment.booking_id)
            .await?
            .ok_or(AppError::NotFound("booking"))?;

        let eligible = eligible_refund(
            payment.total_amount,
            booking.start_time,
            booking.service_type,
            Utc::now(),
        );
        if !policy_override && refund_amount > eligible {
            return Err(AppError::RefundOverPolicy {
                requested: refund_amount,
                eligible,
            });
        }

        let refund = self
            .gateway
            .issue_refund(RefundRequest {
                gateway_payment_id,
                amount_minor: model::to_minor_units(refund_amount),
                receipt: format!("rfnd_{}", payment.id),
                notes: reason.clone(),
            })
            .await?;

        let patch = PaymentPatch {
            refund_amount: Some(refund_amount),
            refund_reason: reason,
            refunded_at: Some(Utc::now()),
            metadata: Some(json!({ "gateway_refund_id": refund.id })),
            ..Default::default()
        };

        let updated = self
            .payments
            .transition(&payment.id, PaymentStatus::Paid, PaymentStatus::Refunded, patch)
            .await?
            .ok_or_else(|| AppError::Conflict("payment state changed concurrently".to_string()))?;

        self.bookings
            .apply_payment_state(&updated.booking_id, PaymentStatus::Refunded, false)
            .await?;

        info!(
            payment_id = %updated.id,
            refund_amount,
            "payment refunded"
        );
        Ok(updated)
    }

    /// A single payment, visible only to its owner.
    pub async fn get_payment(&self, user_id: &str, payment_id: &str) -> AppResult<Payment> {
        self.payments
            .find_by_id(payment_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or(AppError::NotFound("payment"))
    }

    /// User-scoped payment history page.
    pub async fn list_payments(
        &self,
        user_id: &str,
        status: Option<PaymentStatus>,
        page: i64,
        limit: i64,
    ) -> AppResult<(Vec<Payment>, i64)> {
        let limit = limit.clamp(1, 100);
        let page = page.max(1);
        let offset = (page - 1) * limit;

        let (payments, total) = self
            .payments
            .list_for_user(user_id, status, limit, offset)
            .await?;
        Ok((payments, total))
    }

    async fn owned_booking(&self, booking_id: &str, user_id: &str) -> AppResult<Booking> {
        // Ownership failures read as not-found so ids are not probeable.
        self.bookings
            .find_by_id(booking_id)
            .await?
            .filter(|b| b.user_id == user_id)
            .ok_or(AppError::NotFound("booking"))
    }
}
