//! Fulfillment of verified payment events.
//!
//! The processor delivers each event at least once. Everything with an
//! observable effect runs only after [`OrderStore::create_if_absent`]
//! reports that this delivery created the order, so redeliveries (and the
//! session/intent event pairs the processor emits for one payment) collapse
//! into a single set of effects.

use super::notification::NotificationDispatcher;
use crate::entities::PaymentStatus;
use crate::entities::orders::NewOrder;
use crate::payments::events::{CheckoutSession, PaymentIntent};
use crate::payments::{EventHeader, OrderMetadata, ProcessorEvent};
use crate::stores::{CouponStore, CreateOutcome, InventoryStore, OrderStore, StoreError};
use shopflow_sdk::objects::Address;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Not an event type this service acts on.
    UnhandledType(String),
    /// A known type whose payload does not have the expected shape.
    UndecodablePayload(String),
    /// Checkout finished but the money has not arrived yet.
    NotPaid,
    /// The payment was not started by our checkout.
    MissingMetadata,
    MalformedMetadata(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentOutcome {
    Ignored(IgnoreReason),
    Fulfilled {
        order_number: String,
        inventory_failures: usize,
        coupon_incremented: bool,
    },
    Duplicate {
        order_number: String,
    },
    PaymentFailureRecorded {
        order_number: String,
        duplicate: bool,
    },
}

#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The idempotency gate could not be consulted. Nothing has happened
    /// yet, so the event should be redelivered.
    #[error("order store error: {0}")]
    Store(#[from] StoreError),
}

/// The parts of a session or intent the order is rebuilt from.
struct PaymentFacts<'a> {
    event_id: &'a str,
    object_id: &'a str,
    metadata: &'a HashMap<String, String>,
    email: Option<&'a str>,
    shipping_address: Option<Address>,
    failure_message: Option<&'a str>,
}

impl<'a> PaymentFacts<'a> {
    fn from_session(event_id: &'a str, session: &'a CheckoutSession) -> Self {
        Self {
            event_id,
            object_id: &session.id,
            metadata: &session.metadata,
            email: session.email(),
            shipping_address: session.shipping_address(),
            failure_message: None,
        }
    }

    fn from_intent(event_id: &'a str, intent: &'a PaymentIntent) -> Self {
        Self {
            event_id,
            object_id: &intent.id,
            metadata: &intent.metadata,
            email: intent.receipt_email.as_deref(),
            shipping_address: intent.shipping.as_ref().and_then(|s| s.to_address()),
            failure_message: intent.failure_message(),
        }
    }

    fn new_order(&self, snapshot: OrderMetadata, payment_status: PaymentStatus) -> NewOrder {
        let total_cents = snapshot.total_cents();
        let mut customer = snapshot.customer.unwrap_or_default();
        let customer_email = self
            .email
            .map(str::to_owned)
            .or_else(|| customer.email.clone())
            .filter(|e| !e.is_empty());
        if customer.email.is_none() {
            customer.email = customer_email.clone();
        }
        let shipping_address = self
            .shipping_address
            .clone()
            .or_else(|| customer.address.clone());
        NewOrder {
            order_number: snapshot.order_number,
            provider_event_id: self.event_id.to_owned(),
            session_or_intent_id: self.object_id.to_owned(),
            customer_email,
            customer,
            lines: snapshot.lines,
            subtotal_cents: snapshot.subtotal_cents,
            discount_cents: snapshot.discount_cents,
            total_cents,
            currency: snapshot.currency,
            payment_status,
            shipping_address,
            coupon_id: snapshot.coupon_id,
        }
    }
}

pub struct FulfillmentProcessor {
    orders: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryStore>,
    coupons: Arc<dyn CouponStore>,
    notifier: NotificationDispatcher,
}

impl FulfillmentProcessor {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        inventory: Arc<dyn InventoryStore>,
        coupons: Arc<dyn CouponStore>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            orders,
            inventory,
            coupons,
            notifier,
        }
    }

    /// Handle the raw body of an event whose signature is already verified.
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<FulfillmentOutcome, FulfillmentError> {
        let header: EventHeader = match serde_json::from_slice(payload) {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, "Verified payment event is not an event envelope");
                return Ok(FulfillmentOutcome::Ignored(IgnoreReason::UndecodablePayload(
                    e.to_string(),
                )));
            }
        };
        let event: ProcessorEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    event_id = %header.id,
                    event_type = %header.event_type,
                    error = %e,
                    "Payment event payload has an unexpected shape"
                );
                return Ok(FulfillmentOutcome::Ignored(IgnoreReason::UndecodablePayload(
                    e.to_string(),
                )));
            }
        };
        self.handle_event(&header, event).await
    }

    #[tracing::instrument(skip_all, fields(event_id = %header.id, event_type = %header.event_type))]
    pub async fn handle_event(
        &self,
        header: &EventHeader,
        event: ProcessorEvent,
    ) -> Result<FulfillmentOutcome, FulfillmentError> {
        match &event {
            ProcessorEvent::CheckoutSessionCompleted { id, data } => {
                if !data.object.is_paid() {
                    info!(session_id = %data.object.id, "Checkout completed but not paid yet");
                    return Ok(FulfillmentOutcome::Ignored(IgnoreReason::NotPaid));
                }
                self.fulfill(PaymentFacts::from_session(id, &data.object))
                    .await
            }
            ProcessorEvent::CheckoutSessionAsyncPaymentSucceeded { id, data } => {
                self.fulfill(PaymentFacts::from_session(id, &data.object))
                    .await
            }
            ProcessorEvent::PaymentIntentSucceeded { id, data } => {
                self.fulfill(PaymentFacts::from_intent(id, &data.object))
                    .await
            }
            ProcessorEvent::CheckoutSessionAsyncPaymentFailed { id, data } => {
                self.record_failure(PaymentFacts::from_session(id, &data.object))
                    .await
            }
            ProcessorEvent::PaymentIntentPaymentFailed { id, data } => {
                self.record_failure(PaymentFacts::from_intent(id, &data.object))
                    .await
            }
            ProcessorEvent::Unhandled => Ok(FulfillmentOutcome::Ignored(
                IgnoreReason::UnhandledType(header.event_type.clone()),
            )),
        }
    }

    fn snapshot(facts: &PaymentFacts<'_>) -> Result<OrderMetadata, IgnoreReason> {
        match OrderMetadata::decode(facts.metadata) {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => {
                info!(object_id = %facts.object_id, "Payment carries no order metadata");
                Err(IgnoreReason::MissingMetadata)
            }
            Err(e) => {
                error!(
                    object_id = %facts.object_id,
                    error = %e,
                    "Payment carries unreadable order metadata; manual reconciliation needed"
                );
                Err(IgnoreReason::MalformedMetadata(e.to_string()))
            }
        }
    }

    async fn fulfill(&self, facts: PaymentFacts<'_>) -> Result<FulfillmentOutcome, FulfillmentError> {
        let snapshot = match Self::snapshot(&facts) {
            Ok(snapshot) => snapshot,
            Err(reason) => return Ok(FulfillmentOutcome::Ignored(reason)),
        };
        let new_order = facts.new_order(snapshot, PaymentStatus::Paid);
        let order_number = new_order.order_number.clone();

        let order = match self.orders.create_if_absent(new_order.clone()).await? {
            CreateOutcome::Created(order) => order,
            CreateOutcome::AlreadyExists(existing) => {
                if !existing.same_purchase(&new_order) {
                    error!(
                        order_number = %order_number,
                        existing_object_id = %existing.session_or_intent_id,
                        object_id = %facts.object_id,
                        "Order number collision: a different purchase already holds this number"
                    );
                } else {
                    info!(order_number = %order_number, "Order already recorded, skipping");
                }
                return Ok(FulfillmentOutcome::Duplicate { order_number });
            }
        };
        info!(
            order_number = %order.order_number,
            total_cents = order.total_cents,
            "Order recorded"
        );

        let mut inventory_failures = 0;
        for line in &order.lines {
            match self
                .inventory
                .decrement(&line.product_id, line.variant.as_deref(), line.quantity)
                .await
            {
                Ok(remaining) => info!(
                    order_number = %order.order_number,
                    product_id = %line.product_id,
                    variant = ?line.variant,
                    remaining,
                    "Stock decremented"
                ),
                Err(e) => {
                    inventory_failures += 1;
                    error!(
                        order_number = %order.order_number,
                        product_id = %line.product_id,
                        variant = ?line.variant,
                        quantity = line.quantity,
                        error = %e,
                        "Stock decrement failed for a paid order"
                    );
                }
            }
        }

        let coupon_incremented = match order.coupon_id {
            Some(coupon_id) => match self.coupons.increment_usage(coupon_id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        order_number = %order.order_number,
                        coupon_id,
                        error = %e,
                        "Coupon usage not recorded"
                    );
                    false
                }
            },
            None => false,
        };

        self.notifier.order_confirmed(&order).await;

        Ok(FulfillmentOutcome::Fulfilled {
            order_number: order.order_number,
            inventory_failures,
            coupon_incremented,
        })
    }

    async fn record_failure(
        &self,
        facts: PaymentFacts<'_>,
    ) -> Result<FulfillmentOutcome, FulfillmentError> {
        let snapshot = match Self::snapshot(&facts) {
            Ok(snapshot) => snapshot,
            Err(reason) => return Ok(FulfillmentOutcome::Ignored(reason)),
        };
        let new_order = facts.new_order(snapshot, PaymentStatus::Failed);
        let order_number = new_order.order_number.clone();

        match self.orders.create_if_absent(new_order).await? {
            CreateOutcome::Created(order) => {
                info!(
                    order_number = %order_number,
                    reason = ?facts.failure_message,
                    "Payment failure recorded"
                );
                self.notifier
                    .payment_failed(&order, facts.failure_message)
                    .await;
                Ok(FulfillmentOutcome::PaymentFailureRecorded {
                    order_number,
                    duplicate: false,
                })
            }
            CreateOutcome::AlreadyExists(existing) => {
                info!(
                    order_number = %order_number,
                    payment_status = ?existing.payment_status,
                    "Payment failure for an order already on file, skipping"
                );
                Ok(FulfillmentOutcome::PaymentFailureRecorded {
                    order_number,
                    duplicate: true,
                })
            }
        }
    }
}
