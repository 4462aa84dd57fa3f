//! Processor webhook events.
//!
//! Only the fields the fulfillment path reads are modelled; everything
//! else in the payload is ignored. Unknown event types decode to
//! [`ProcessorEvent::Unhandled`].

use serde::Deserialize;
use shopflow_sdk::objects::Address;
use std::collections::HashMap;

/// The part of every event envelope we can read before knowing its type.
#[derive(Debug, Clone, Deserialize)]
pub struct EventHeader {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData<T> {
    pub object: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ProcessorEvent {
    #[serde(rename = "checkout.session.completed")]
    CheckoutSessionCompleted {
        id: String,
        data: EventData<CheckoutSession>,
    },
    #[serde(rename = "checkout.session.async_payment_succeeded")]
    CheckoutSessionAsyncPaymentSucceeded {
        id: String,
        data: EventData<CheckoutSession>,
    },
    #[serde(rename = "checkout.session.async_payment_failed")]
    CheckoutSessionAsyncPaymentFailed {
        id: String,
        data: EventData<CheckoutSession>,
    },
    #[serde(rename = "payment_intent.succeeded")]
    PaymentIntentSucceeded {
        id: String,
        data: EventData<PaymentIntent>,
    },
    #[serde(rename = "payment_intent.payment_failed")]
    PaymentIntentPaymentFailed {
        id: String,
        data: EventData<PaymentIntent>,
    },
    #[serde(other)]
    Unhandled,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessorAddress {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<ProcessorAddress>,
}

impl ShippingDetails {
    pub fn to_address(&self) -> Option<Address> {
        let address = self.address.as_ref()?;
        Some(Address {
            name: self.name.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: self.phone.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectedInformation {
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// `paid`, `unpaid` or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub shipping_details: Option<ShippingDetails>,
    /// Newer API versions move shipping here.
    #[serde(default)]
    pub collected_information: Option<CollectedInformation>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// A session discounted to zero completes as `no_payment_required`
    /// and never produces a payment intent.
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            Some("paid" | "no_payment_required")
        )
    }

    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }

    pub fn shipping_address(&self) -> Option<Address> {
        self.collected_information
            .as_ref()
            .and_then(|c| c.shipping_details.as_ref())
            .or(self.shipping_details.as_ref())
            .and_then(ShippingDetails::to_address)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub shipping: Option<ShippingDetails>,
    #[serde(default)]
    pub last_payment_error: Option<PaymentError>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    pub fn failure_message(&self) -> Option<&str> {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_completed_session() {
        let payload = r#"{
            "id": "evt_1",
            "object": "event",
            "type": "checkout.session.completed",
            "created": 1700000000,
            "livemode": false,
            "data": {"object": {
                "id": "cs_test_1",
                "object": "checkout.session",
                "payment_status": "paid",
                "customer_details": {"email": "buyer@example.com", "name": "Ada"},
                "collected_information": {"shipping_details": {
                    "name": "Ada Lovelace",
                    "address": {"line1": "1 Main St", "city": "Springfield", "country": "US"}
                }},
                "metadata": {"order_number": "SF-20260301-00000001"}
            }}
        }"#;
        let event: ProcessorEvent = serde_json::from_str(payload).unwrap();
        let ProcessorEvent::CheckoutSessionCompleted { id, data } = event else {
            panic!("wrong variant");
        };
        assert_eq!(id, "evt_1");
        let session = data.object;
        assert!(session.is_paid());
        assert_eq!(session.email(), Some("buyer@example.com"));
        let address = session.shipping_address().unwrap();
        assert_eq!(address.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(address.line1.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn fully_discounted_session_counts_as_paid() {
        let payload = r#"{"id": "cs_2", "payment_status": "no_payment_required"}"#;
        let session: CheckoutSession = serde_json::from_str(payload).unwrap();
        assert!(session.is_paid());

        let payload = r#"{"id": "cs_3", "payment_status": "unpaid"}"#;
        let session: CheckoutSession = serde_json::from_str(payload).unwrap();
        assert!(!session.is_paid());
    }

    #[test]
    fn unknown_type_is_unhandled() {
        let payload = r#"{"id":"evt_2","type":"customer.created","data":{"object":{}}}"#;
        let event: ProcessorEvent = serde_json::from_str(payload).unwrap();
        assert!(matches!(event, ProcessorEvent::Unhandled));
    }

    #[test]
    fn legacy_shipping_details_are_read() {
        let payload = r#"{
            "id": "cs_1",
            "customer_email": "legacy@example.com",
            "shipping_details": {"name": "Bob", "address": {"postal_code": "12345"}}
        }"#;
        let session: CheckoutSession = serde_json::from_str(payload).unwrap();
        assert!(!session.is_paid());
        assert_eq!(session.email(), Some("legacy@example.com"));
        assert_eq!(
            session.shipping_address().unwrap().postal_code.as_deref(),
            Some("12345")
        );
    }
}
