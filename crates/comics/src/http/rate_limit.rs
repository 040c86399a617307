use std::time::Duration;

use async_trait::async_trait;
use reqwest::Request;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

use super::{ApiResponse, Middleware, Next};
use crate::error::SourceError;

/// Spaces requests to one host at least `interval` apart. Other hosts pass
/// straight through.
pub struct HostRateLimit {
    host: String,
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl HostRateLimit {
    pub fn new(host: impl Into<String>, interval: Duration) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            interval,
            next_slot: Mutex::new(None),
        }
    }

    fn applies_to(&self, request: &Request) -> bool {
        request
            .url()
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(&self.host))
    }
}

#[async_trait]
impl Middleware for HostRateLimit {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<ApiResponse, SourceError> {
        if self.applies_to(&request) {
            // Slots are handed out under the lock; the sleep happens inside it
            // so waiters queue in order.
            let mut slot = self.next_slot.lock().await;
            if let Some(at) = *slot
                && at > Instant::now()
            {
                trace!(host = %self.host, wait = ?(at - Instant::now()), "Rate limited");
                tokio::time::sleep_until(at).await;
            }
            *slot = Some(Instant::now() + self.interval);
        }

        next.run(request).await
    }
}
