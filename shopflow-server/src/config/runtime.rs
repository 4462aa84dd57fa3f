//! Runtime configuration re-exports.
//!
//! The actual config types are defined in `shopflow_core::config`.
//! This module re-exports them for convenience.

pub use shopflow_core::config::{
    EmailConfig, PartnerConfig, PaymentsConfig, ServerConfig, SharedConfig, StorefrontConfig,
    TimeoutsConfig,
};
