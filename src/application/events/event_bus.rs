//! Event bus for broadcasting events to subscribers
//!
//! Two ways to listen: pull with [`EventBus::subscribe`] and `recv()`, or
//! push with [`EventBus::subscribe_fn`], which returns a [`Subscription`]
//! handle. Dropping the handle (or calling `unsubscribe`) detaches the
//! callback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::shared::shutdown::ShutdownSignal;

const DEFAULT_CAPACITY: usize = 256;

/// Event bus for broadcasting events to all subscribers
pub struct EventBus<E: Clone + Send + 'static> {
    name: &'static str,
    sender: broadcast::Sender<E>,
    subscriber_count: Arc<AtomicUsize>,
}

impl<E: Clone + Send + 'static> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            sender: self.sender.clone(),
            subscriber_count: self.subscriber_count.clone(),
        }
    }
}

impl<E: Clone + Send + 'static> EventBus<E> {
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            name,
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn publish(&self, event: E) {
        match self.sender.send(event) {
            Ok(count) => debug!(bus = self.name, subscribers = count, "Event published"),
            Err(_) => debug!(bus = self.name, "Event published (no subscribers)"),
        }
    }

    pub fn subscribe(&self) -> EventSubscriber<E> {
        let receiver = self.sender.subscribe();
        let total = self.subscriber_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(bus = self.name, total, "New event subscriber");

        EventSubscriber {
            name: self.name,
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    /// Invoke `callback` for every event, in publish order, until the
    /// returned handle is dropped.
    pub fn subscribe_fn<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(E) + Send + 'static,
    {
        let mut subscriber = self.subscribe();
        let task = tokio::spawn(async move {
            while let Some(event) = subscriber.recv().await {
                callback(event);
            }
        });
        Subscription { task: Some(task) }
    }

    /// Like [`subscribe_fn`](Self::subscribe_fn), but the callback is also
    /// detached when `stop` fires.
    pub fn subscribe_fn_until<F>(&self, mut callback: F, stop: ShutdownSignal) -> Subscription
    where
        F: FnMut(E) + Send + 'static,
    {
        let mut subscriber = self.subscribe();
        let stopped = stop.notified();
        let task = tokio::spawn(async move {
            let wait = stopped.wait();
            tokio::pin!(wait);
            loop {
                tokio::select! {
                    event = subscriber.recv() => match event {
                        Some(event) => callback(event),
                        None => break,
                    },
                    _ = &mut wait => break,
                }
            }
        });
        Subscription { task: Some(task) }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

/// Event subscriber that receives events from the bus
pub struct EventSubscriber<E: Clone + Send + 'static> {
    name: &'static str,
    receiver: broadcast::Receiver<E>,
    subscriber_count: Arc<AtomicUsize>,
}

impl<E: Clone + Send + 'static> EventSubscriber<E> {
    /// Next event, or `None` once the bus is gone. Lagged events are
    /// skipped with a warning.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(bus = self.name, missed = count, "Subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<E> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(bus = self.name, missed = count, "Subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

impl<E: Clone + Send + 'static> Drop for EventSubscriber<E> {
    fn drop(&mut self) {
        let prev = self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
        debug!(bus = self.name, remaining = prev.saturating_sub(1), "Event subscriber detached");
    }
}

/// Handle returned by [`EventBus::subscribe_fn`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn detach(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
