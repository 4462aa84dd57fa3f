//! Orchestration of inbound events.
//!
//! - `FulfillmentProcessor`: verified payment events → order, stock, coupon, notifications
//! - `ShipmentProcessor`: partner shipment notifications → tracking, email
//! - `NotificationDispatcher`: best-effort email and partner fan-out used by both

pub mod fulfillment;
pub mod notification;
pub mod shipment;

pub use fulfillment::{FulfillmentError, FulfillmentOutcome, FulfillmentProcessor, IgnoreReason};
pub use notification::NotificationDispatcher;
pub use shipment::{ShipmentError, ShipmentProcessor};
