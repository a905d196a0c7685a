//! Timer scheduling
//!
//! `schedule(after, callback) -> handle` and `cancel(handle)`. The tokio
//! implementation reads the runtime clock, so paused-time tests drive it
//! deterministically.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::trace;

pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

pub trait Scheduler: Send + Sync {
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a pending callback. Cancelling a fired or unknown handle is a no-op.
    fn cancel(&self, handle: TimerHandle);

    /// Number of callbacks scheduled and not yet fired or cancelled.
    fn pending(&self) -> usize;
}

/// Scheduler backed by `tokio::time::sleep` tasks.
#[derive(Clone, Default)]
pub struct TokioScheduler {
    next_id: Arc<AtomicU64>,
    timers: Arc<DashMap<u64, AbortHandle>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<dyn Scheduler> {
        Arc::new(Self::new())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, after: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let timers = self.timers.clone();
        let deadline = Instant::now() + after;

        // The task waits until its abort handle is registered, so a short
        // timer cannot fire before `cancel` is able to see it.
        let (armed_tx, armed_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = armed_rx.await;
            tokio::time::sleep_until(deadline).await;
            if timers.remove(&id).is_some() {
                trace!(timer = id, "Timer fired");
                callback();
            }
        });

        self.timers.insert(id, task.abort_handle());
        let _ = armed_tx.send(());
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some((_, abort)) = self.timers.remove(&handle.0) {
            abort.abort();
            trace!(timer = handle.0, "Timer cancelled");
        }
    }

    fn pending(&self) -> usize {
        self.timers.len()
    }
}
