//! Payment processor integration.
//!
//! - [`client`]: creating hosted checkout sessions
//! - [`events`]: the webhook event shapes we act on
//! - [`metadata`]: the order snapshot carried through session metadata
//! - [`recording`]: an in-memory processor for tests and local runs

pub mod client;
pub mod events;
pub mod metadata;
pub mod recording;

pub use client::{
    PaymentProcessor, ProcessorError, ProcessorSession, SessionLineItem, SessionRequest,
    StripeCheckoutClient,
};
pub use events::{EventHeader, ProcessorEvent};
pub use metadata::{MetadataError, OrderMetadata};
pub use recording::RecordingPaymentProcessor;
