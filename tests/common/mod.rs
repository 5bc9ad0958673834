//! Shared test fixtures: in-memory stores and a fake gateway injected
//! through the same seams the Postgres and Razorpay implementations use.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use ridepool_backend::database::error::DatabaseError;
use ridepool_backend::database::repository::{
    BookingStore, PaymentPatch, PaymentStore, WebhookEventLog,
};
use ridepool_backend::gateway::signature::SignatureSecrets;
use ridepool_backend::gateway::traits::GatewayClient;
use ridepool_backend::gateway::types::{
    CreateOrderRequest, GatewayPayment, GatewayPaymentStatus, OrderRef, RefundRef, RefundRequest,
    WebhookEnvelope,
};
use ridepool_backend::gateway::GatewayError;
use ridepool_backend::model::{Booking, BookingStatus, Payment, PaymentStatus, ServiceType};
use ridepool_backend::service::PaymentService;

pub const CHECKOUT_SECRET: &str = "test_checkout_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

pub fn secrets() -> SignatureSecrets {
    SignatureSecrets {
        checkout_secret: CHECKOUT_SECRET.to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
    }
}

#[derive(Default)]
pub struct InMemoryPaymentStore {
    payments: Mutex<HashMap<String, Payment>>,
}

impl InMemoryPaymentStore {
    pub fn get(&self, id: &str) -> Option<Payment> {
        self.payments.lock().unwrap().get(id).cloned()
    }

    pub fn count(&self) -> usize {
        self.payments.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<Payment, DatabaseError> {
        let mut payments = self.payments.lock().unwrap();
        let duplicate = payments.values().any(|p| {
            p.booking_id == payment.booking_id
                && matches!(p.status, PaymentStatus::Pending | PaymentStatus::Paid)
        });
        if duplicate {
            return Err(DatabaseError::UniqueViolation {
                constraint: "payments_one_active_per_booking".to_string(),
            });
        }
        payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Payment>, DatabaseError> {
        Ok(self.payments.lock().unwrap().get(id).cloned())
    }

    async fn find_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, DatabaseError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|p| p.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn find_active_for_booking(
        &self,
        booking_id: &str,
    ) -> Result<Option<Payment>, DatabaseError> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .values()
            .find(|p| {
                p.booking_id == booking_id
                    && matches!(p.status, PaymentStatus::Pending | PaymentStatus::Paid)
            })
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<PaymentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Payment>, i64), DatabaseError> {
        let payments = self.payments.lock().unwrap();
        let mut matching: Vec<Payment> = payments
            .values()
            .filter(|p| p.user_id == user_id && status.map_or(true, |s| p.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page: Vec<Payment> = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn transition(
        &self,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
        patch: PaymentPatch,
    ) -> Result<Option<Payment>, DatabaseError> {
        let mut payments = self.payments.lock().unwrap();
        let Some(payment) = payments.get_mut(id) else {
            return Ok(None);
        };
        if payment.status != from {
            return Ok(None);
        }

        payment.status = to;
        if let Some(v) = patch.gateway_payment_id {
            payment.gateway_payment_id = Some(v);
        }
        if let Some(v) = patch.gateway_signature {
            payment.gateway_signature = Some(v);
        }
        if let Some(v) = patch.transaction_id {
            payment.transaction_id = Some(v);
        }
        if let Some(v) = patch.failure_reason {
            payment.failure_reason = Some(v);
        }
        if let Some(v) = patch.refund_amount {
            payment.refund_amount = Some(v);
        }
        if let Some(v) = patch.refund_reason {
            payment.refund_reason = Some(v);
        }
        if let Some(v) = patch.refunded_at {
            payment.refunded_at = Some(v);
        }
        if let Some(v) = patch.metadata {
            payment.metadata = Some(v);
        }
        payment.updated_at = Utc::now();

        Ok(Some(payment.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<HashMap<String, Booking>>,
    /// Number of booking writes that actually changed state.
    pub effective_updates: AtomicUsize,
}

impl InMemoryBookingStore {
    pub fn seed(&self, booking: Booking) {
        self.bookings
            .lock()
            .unwrap()
            .insert(booking.id.clone(), booking);
    }

    pub fn get(&self, id: &str) -> Option<Booking> {
        self.bookings.lock().unwrap().get(id).cloned()
    }

    pub fn effective_update_count(&self) -> usize {
        self.effective_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, DatabaseError> {
        Ok(self.bookings.lock().unwrap().get(id).cloned())
    }

    async fn link_payment(
        &self,
        booking_id: &str,
        payment_id: &str,
        payment_status: PaymentStatus,
    ) -> Result<(), DatabaseError> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings.get_mut(booking_id).ok_or(DatabaseError::NotFound)?;
        booking.payment_id = Some(payment_id.to_string());
        booking.payment_status = Some(payment_status);
        booking.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_payment_state(
        &self,
        booking_id: &str,
        payment_status: PaymentStatus,
        confirm: bool,
    ) -> Result<bool, DatabaseError> {
        let mut bookings = self.bookings.lock().unwrap();
        let Some(booking) = bookings.get_mut(booking_id) else {
            return Ok(false);
        };

        let changed = booking.payment_status != Some(payment_status)
            || (confirm && booking.status != BookingStatus::Confirmed);
        if !changed {
            return Ok(false);
        }

        booking.payment_status = Some(payment_status);
        if confirm {
            booking.status = BookingStatus::Confirmed;
        }
        booking.updated_at = Utc::now();
        self.effective_updates.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

#[derive(Debug, Clone)]
pub struct RecordedWebhookEvent {
    pub id: String,
    pub event_type: String,
    pub processed: bool,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Default)]
pub struct InMemoryWebhookLog {
    events: Mutex<Vec<RecordedWebhookEvent>>,
}

impl InMemoryWebhookLog {
    pub fn events(&self) -> Vec<RecordedWebhookEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookEventLog for InMemoryWebhookLog {
    async fn record(
        &self,
        event_type: &str,
        _source: &str,
        _payload: serde_json::Value,
    ) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        self.events.lock().unwrap().push(RecordedWebhookEvent {
            id: id.clone(),
            event_type: event_type.to_string(),
            processed: false,
            attempts: 0,
            last_error: None,
        });
        Ok(id)
    }

    async fn mark_processed(&self, event_id: &str) -> Result<(), DatabaseError> {
        let mut events = self.events.lock().unwrap();
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(DatabaseError::NotFound)?;
        event.processed = true;
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<(), DatabaseError> {
        let mut events = self.events.lock().unwrap();
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or(DatabaseError::NotFound)?;
        event.attempts += 1;
        event.last_error = Some(error.to_string());
        Ok(())
    }
}

/// Gateway fake: records calls, hands out sequential order ids, and reports
/// whatever capture status the test configured (captured by default).
#[derive(Default)]
pub struct FakeGateway {
    pub orders: Mutex<Vec<CreateOrderRequest>>,
    pub refunds: Mutex<Vec<RefundRequest>>,
    payment_statuses: Mutex<HashMap<String, GatewayPaymentStatus>>,
    fail_next_order: AtomicBool,
    order_seq: AtomicUsize,
}

impl FakeGateway {
    pub fn fail_next_order(&self) {
        self.fail_next_order.store(true, Ordering::SeqCst);
    }

    pub fn set_payment_status(&self, gateway_payment_id: &str, status: GatewayPaymentStatus) {
        self.payment_statuses
            .lock()
            .unwrap()
            .insert(gateway_payment_id.to_string(), status);
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn refund_count(&self) -> usize {
        self.refunds.lock().unwrap().len()
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderRef, GatewayError> {
        if self.fail_next_order.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Unavailable {
                message: "gateway timeout".to_string(),
            });
        }

        let seq = self.order_seq.fetch_add(1, Ordering::SeqCst);
        let order = OrderRef {
            id: format!("order_{}", seq),
            amount: request.amount_minor,
            currency: request.currency.clone(),
        };
        self.orders.lock().unwrap().push(request);
        Ok(order)
    }

    async fn fetch_payment(
        &self,
        gateway_payment_id: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let status = self
            .payment_statuses
            .lock()
            .unwrap()
            .get(gateway_payment_id)
            .copied()
            .unwrap_or(GatewayPaymentStatus::Captured);

        Ok(GatewayPayment {
            id: gateway_payment_id.to_string(),
            order_id: None,
            status,
            method: Some("upi".to_string()),
            amount_minor: 0,
        })
    }

    async fn issue_refund(&self, request: RefundRequest) -> Result<RefundRef, GatewayError> {
        let refund = RefundRef {
            id: format!("rf_{}", self.refunds.lock().unwrap().len()),
            amount_minor: request.amount_minor,
        };
        self.refunds.lock().unwrap().push(request);
        Ok(refund)
    }
}

pub struct TestHarness {
    pub service: Arc<PaymentService>,
    pub gateway: Arc<FakeGateway>,
    pub payments: Arc<InMemoryPaymentStore>,
    pub bookings: Arc<InMemoryBookingStore>,
    pub webhook_log: Arc<InMemoryWebhookLog>,
}

pub fn harness() -> TestHarness {
    let gateway = Arc::new(FakeGateway::default());
    let payments = Arc::new(InMemoryPaymentStore::default());
    let bookings = Arc::new(InMemoryBookingStore::default());
    let webhook_log = Arc::new(InMemoryWebhookLog::default());

    let service = Arc::new(PaymentService::new(
        gateway.clone(),
        payments.clone(),
        bookings.clone(),
        webhook_log.clone(),
        secrets(),
    ));

    TestHarness {
        service,
        gateway,
        payments,
        bookings,
        webhook_log,
    }
}

/// A booking fixture starting `hours_to_start` hours from now.
pub fn booking(
    id: &str,
    user_id: &str,
    amount: i64,
    platform_fee: i64,
    service_type: ServiceType,
    hours_to_start: i64,
) -> Booking {
    let now = Utc::now();
    Booking {
        id: id.to_string(),
        user_id: user_id.to_string(),
        amount,
        platform_fee,
        total_amount: amount + platform_fee,
        service_type,
        status: BookingStatus::Pending,
        start_time: now + Duration::hours(hours_to_start),
        payment_id: None,
        payment_status: None,
        created_at: now,
        updated_at: now,
    }
}

/// Build a `payment.captured` webhook envelope plus its raw JSON payload.
pub fn capture_event(order_id: &str, gateway_payment_id: &str) -> (WebhookEnvelope, serde_json::Value) {
    let raw = serde_json::json!({
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": gateway_payment_id,
                    "order_id": order_id,
                    "status": "captured",
                    "method": "upi",
                }
            }
        }
    });
    let envelope = serde_json::from_value(raw.clone()).unwrap();
    (envelope, raw)
}

/// Build a `payment.failed` webhook envelope plus its raw JSON payload.
pub fn failure_event(
    order_id: &str,
    gateway_payment_id: &str,
    reason: &str,
) -> (WebhookEnvelope, serde_json::Value) {
    let raw = serde_json::json!({
        "event": "payment.failed",
        "payload": {
            "payment": {
                "entity": {
                    "id": gateway_payment_id,
                    "order_id": order_id,
                    "status": "failed",
                    "error_description": reason,
                }
            }
        }
    });
    let envelope = serde_json::from_value(raw.clone()).unwrap();
    (envelope, raw)
}
