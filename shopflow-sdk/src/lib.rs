//! Shared types for the Shopflow checkout server.
//!
//! `objects` holds the storefront-facing request/response bodies and the
//! order snapshot types that travel through payment-processor metadata.
//! `signature` implements both HMAC schemes the server verifies.

pub mod objects;
pub mod signature;

#[cfg(feature = "client")]
pub mod client;
