//! In-memory notification channels for tests and local runs.

use super::{EmailMessage, EmailSender, NotifyError, PartnerClient, PartnerOrder};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<String, NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected {
                status: 500,
                body: "mail provider down".to_owned(),
            });
        }
        let mut sent = self.sent.lock().await;
        sent.push(message);
        Ok(format!("msg_{}", sent.len()))
    }
}

#[derive(Debug, Default)]
pub struct RecordingPartnerClient {
    orders: Mutex<Vec<PartnerOrder>>,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl RecordingPartnerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_orders(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn orders(&self) -> Vec<PartnerOrder> {
        self.orders.lock().await.clone()
    }
}

#[async_trait]
impl PartnerClient for RecordingPartnerClient {
    async fn create_order(&self, order: &PartnerOrder) -> Result<String, NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected {
                status: 400,
                body: "invalid address".to_owned(),
            });
        }
        let mut orders = self.orders.lock().await;
        orders.push(order.clone());
        Ok(format!("{}", 1000 + orders.len()))
    }
}
