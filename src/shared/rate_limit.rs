//! Sliding-window rate limiter
//!
//! Counts admissions per key inside a moving window. Used to gate login
//! submissions and, with its own parameters, general outbound API calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info};

use super::shutdown::ShutdownSignal;
use super::types::errors::{ClientError, ClientResult};

#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: &'static str,
    max_requests: usize,
    window: Duration,
    windows: Arc<DashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, max_requests: usize, window: Duration) -> Self {
        Self {
            name,
            max_requests,
            window,
            windows: Arc::new(DashMap::new()),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit and record one request for `key`, or deny without recording.
    pub fn is_allowed(&self, key: &str) -> bool {
        self.admit(key, Instant::now()).is_ok()
    }

    /// Like [`is_allowed`](Self::is_allowed) but denial carries the wait time.
    pub fn check(&self, key: &str) -> ClientResult<()> {
        self.admit(key, Instant::now())
            .map_err(|retry_after| {
                metrics::counter!("monitor_rate_limit_denied_total", "limiter" => self.name)
                    .increment(1);
                debug!(
                    limiter = self.name,
                    key,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Request denied by rate limiter"
                );
                ClientError::RateLimited { retry_after }
            })
    }

    fn admit(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut entry = self.windows.entry(key.to_string()).or_default();
        let stamps = entry.value_mut();
        prune(stamps, now, self.window);

        if stamps.len() >= self.max_requests {
            // Oldest stamp leaving the window frees the next slot.
            let retry_after = stamps
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            return Err(retry_after);
        }

        stamps.push_back(now);
        Ok(())
    }

    /// Remaining admissions for `key` in the current window.
    pub fn remaining(&self, key: &str) -> usize {
        let now = Instant::now();
        match self.windows.get_mut(key) {
            Some(mut entry) => {
                prune(entry.value_mut(), now, self.window);
                self.max_requests.saturating_sub(entry.len())
            }
            None => self.max_requests,
        }
    }

    /// Prune every key and drop the ones left empty.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, stamps| {
            prune(stamps, now, self.window);
            !stamps.is_empty()
        });
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(limiter = self.name, removed, "Rate limiter keys expired");
        }
    }

    pub fn reset(&self) {
        self.windows.clear();
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Run [`cleanup`](Self::cleanup) on a fixed interval until shutdown.
    pub fn spawn_cleanup(&self, every: Duration, shutdown: ShutdownSignal) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            info!(
                limiter = limiter.name,
                interval_secs = every.as_secs(),
                "Rate limiter cleanup started"
            );
            loop {
                tokio::select! {
                    _ = interval.tick() => limiter.cleanup(),
                    _ = shutdown.notified().wait() => break,
                }
            }
            debug!(limiter = limiter.name, "Rate limiter cleanup stopped");
        });
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = stamps.front() {
        if now.saturating_duration_since(*oldest) > window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}
