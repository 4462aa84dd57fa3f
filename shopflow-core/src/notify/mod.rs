//! Outbound notification channels.
//!
//! Both channels are best-effort: callers log failures and move on. The
//! traits here are the seams the dispatcher is built on; [`email`] and
//! [`partner`] hold the HTTP implementations, [`recording`] the fakes.

pub mod email;
pub mod partner;
pub mod recording;

pub use email::HttpEmailSender;
pub use partner::{HttpPartnerClient, PartnerOrder};
pub use recording::{RecordingEmailSender, RecordingPartnerClient};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    #[error("order has no customer email")]
    MissingRecipient,

    #[error("channel disabled in configuration")]
    Disabled,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one message and return the provider's message id.
    async fn send(&self, message: EmailMessage) -> Result<String, NotifyError>;
}

#[async_trait]
pub trait PartnerClient: Send + Sync {
    /// Create the order at the partner and return its id there.
    async fn create_order(&self, order: &PartnerOrder) -> Result<String, NotifyError>;
}
