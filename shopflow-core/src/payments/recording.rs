use super::client::{PaymentProcessor, ProcessorError, ProcessorSession, SessionRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Keeps every session request and answers with a fake hosted page.
#[derive(Debug, Default)]
pub struct RecordingPaymentProcessor {
    requests: Mutex<Vec<SessionRequest>>,
    fail: AtomicBool,
}

impl RecordingPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail as if the processor returned 503.
    pub fn fail_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProcessor for RecordingPaymentProcessor {
    async fn create_session(&self, request: SessionRequest) -> Result<ProcessorSession, ProcessorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProcessorError::Rejected {
                status: 503,
                body: "processor unavailable".to_owned(),
            });
        }
        let mut requests = self.requests.lock().await;
        let session_id = format!("cs_test_{}", requests.len() + 1);
        requests.push(request);
        Ok(ProcessorSession {
            redirect_url: format!("https://checkout.example/pay/{session_id}"),
            session_id,
        })
    }
}
