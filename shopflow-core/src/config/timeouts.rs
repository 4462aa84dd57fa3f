use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutsConfig {
    /// Per-request timeout of outbound HTTP clients.
    pub http_secs: u64,
    /// Upper bound on each best-effort notification step.
    pub notification_secs: u64,
}

impl TimeoutsConfig {
    pub fn http(&self) -> Duration {
        Duration::from_secs(self.http_secs)
    }

    pub fn notification(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            http_secs: 10,
            notification_secs: 15,
        }
    }
}
