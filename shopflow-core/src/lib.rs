#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod checkout;
pub mod config;
pub mod discount;
pub mod entities;
pub mod framework;
pub mod notify;
pub mod payments;
pub mod processors;
pub mod stores;
pub mod utils;
