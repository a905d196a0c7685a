//! Realtime alert channel
//!
//! Owns one driver task per `open()`. The driver dials through the
//! [`RealtimeTransport`], feeds every inbound event through the
//! [`ChannelState`] table and sleeps out the backoff between attempts.
//! `close()` fires the driver's cancel signal, so an in-flight reconnect
//! wait ends immediately.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::events::{EventBus, EventSubscriber, Subscription};
use crate::application::ports::{ChannelInput, RealtimeTransport};
use crate::domain::{
    AlertEvent, ChannelError, ChannelNotification, ClientError, ClientResult, ConnectionState, User,
};
use crate::shared::shutdown::ShutdownSignal;

use super::policy::ReconnectPolicy;
use super::state::{ChannelState, StateInput, Transition};

struct Shared {
    machine: ChannelState,
    /// Bumped on every open/close so a superseded driver cannot touch state.
    generation: u64,
}

struct Driver {
    cancel: ShutdownSignal,
    task: JoinHandle<()>,
}

pub struct RealtimeChannel {
    transport: Arc<dyn RealtimeTransport>,
    policy: ReconnectPolicy,
    shared: Arc<Mutex<Shared>>,
    alerts: EventBus<AlertEvent>,
    notifications: EventBus<ChannelNotification>,
    driver: Mutex<Option<Driver>>,
}

impl RealtimeChannel {
    pub fn new(transport: Arc<dyn RealtimeTransport>, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            shared: Arc::new(Mutex::new(Shared {
                machine: ChannelState::new(),
                generation: 0,
            })),
            alerts: EventBus::new("alerts"),
            notifications: EventBus::new("channel"),
            driver: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Start connecting with `token`. Replaces any previous connection.
    pub fn open(&self, token: &str) -> ClientResult<()> {
        if token.trim().is_empty() {
            return Err(ClientError::Channel(ChannelError::Auth(
                "missing access credential".to_string(),
            )));
        }

        self.stop_driver();

        let (generation, dialed) = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.machine = ChannelState::new();
            let dialed = shared.machine.apply(StateInput::Dial, &self.policy);
            (shared.generation, dialed)
        };
        if let Some(t) = dialed {
            self.notifications
                .publish(ChannelNotification::state_changed(t.from, t.to));
        }

        let cancel = ShutdownSignal::new();
        let link = Link {
            transport: self.transport.clone(),
            policy: self.policy.clone(),
            shared: self.shared.clone(),
            alerts: self.alerts.clone(),
            notifications: self.notifications.clone(),
            generation,
            token: token.to_string(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(link.run());
        *lock(&self.driver) = Some(Driver { cancel, task });

        info!(generation, "📡 Realtime channel opening");
        Ok(())
    }

    /// Close the channel. Idempotent; the state ends in `CLOSED`.
    pub fn close(&self) {
        self.stop_driver();

        let transition = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.machine.apply(StateInput::Close, &self.policy)
        };
        if let Some(t) = transition {
            info!(from = %t.from, "📴 Realtime channel closed");
            self.notifications
                .publish(ChannelNotification::state_changed(t.from, t.to));
        }
    }

    fn stop_driver(&self) {
        if let Some(driver) = lock(&self.driver).take() {
            driver.cancel.trigger();
            driver.task.abort();
        }
    }

    // ── State ──────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        lock(&self.shared).machine.state
    }

    /// Most recent failure, cleared by the next successful connect.
    pub fn last_error(&self) -> Option<ChannelError> {
        lock(&self.shared).machine.last_error.clone()
    }

    /// Readable form of [`last_error`](Self::last_error).
    pub fn error_message(&self) -> Option<String> {
        self.last_error().map(|e| e.message())
    }

    pub fn attempts(&self) -> u32 {
        lock(&self.shared).machine.attempts
    }

    /// Identity the server resolved during the handshake.
    pub fn server_user(&self) -> Option<User> {
        lock(&self.shared).machine.user.clone()
    }

    pub fn snapshot(&self) -> ChannelState {
        lock(&self.shared).machine.clone()
    }

    // ── Subscriptions ──────────────────────────────────────────

    pub fn alerts(&self) -> EventSubscriber<AlertEvent> {
        self.alerts.subscribe()
    }

    pub fn on_alert<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(AlertEvent) + Send + 'static,
    {
        self.alerts.subscribe_fn(callback)
    }

    pub fn notifications(&self) -> EventSubscriber<ChannelNotification> {
        self.notifications.subscribe()
    }

    pub fn on_state_change<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(ChannelNotification) + Send + 'static,
    {
        self.notifications.subscribe_fn(callback)
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.stop_driver();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ── Driver ─────────────────────────────────────────────────────

/// Everything the driver task needs, detached from the channel handle.
struct Link {
    transport: Arc<dyn RealtimeTransport>,
    policy: ReconnectPolicy,
    shared: Arc<Mutex<Shared>>,
    alerts: EventBus<AlertEvent>,
    notifications: EventBus<ChannelNotification>,
    generation: u64,
    token: String,
    cancel: ShutdownSignal,
}

impl Link {
    async fn run(self) {
        // `open()` has already moved the state to CONNECTING.
        loop {
            let Some(failure) = self.attempt().await else {
                break;
            };

            let Some(delay) = failure.retry_in else {
                debug!(state = %failure.to, "Realtime channel not retrying");
                break;
            };

            metrics::counter!("monitor_realtime_reconnects_total").increment(1);
            info!(
                delay_ms = delay.as_millis() as u64,
                attempt = self.attempts(),
                max_attempts = self.policy.max_attempts,
                "🔄 Realtime channel reconnecting"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.wait() => break,
            }

            if self.step(StateInput::Dial).is_none() {
                break;
            }
        }
    }

    /// One connection attempt. Returns the failure transition that ended
    /// it, or `None` when cancelled or superseded.
    async fn attempt(&self) -> Option<Transition> {
        let opened = tokio::select! {
            r = tokio::time::timeout(self.policy.connect_timeout, self.transport.open(&self.token)) => r,
            _ = self.cancel.wait() => return None,
        };

        let mut connection = match opened {
            Err(_) => {
                let error = ChannelError::Transport(format!(
                    "connection attempt timed out after {}ms",
                    self.policy.connect_timeout.as_millis()
                ));
                return self.step(StateInput::Failed(error));
            }
            Ok(Err(error)) => return self.step(StateInput::Failed(error)),
            Ok(Ok(connection)) => connection,
        };

        loop {
            let input = tokio::select! {
                event = connection.events.recv() => event,
                _ = self.cancel.wait() => {
                    connection.close();
                    return None;
                }
            };

            match input {
                None => {
                    return self.step(StateInput::Dropped {
                        reason: "transport closed".to_string(),
                    });
                }
                Some(ChannelInput::Connect) => {
                    self.step(StateInput::Connect);
                }
                Some(ChannelInput::Connected { user }) => {
                    self.step(StateInput::Authenticated { user });
                }
                Some(ChannelInput::Disconnect { reason }) => {
                    connection.close();
                    return self.step(StateInput::Dropped { reason });
                }
                Some(ChannelInput::ConnectError(error)) => {
                    connection.close();
                    return self.step(StateInput::Failed(error));
                }
                Some(ChannelInput::ServerError(data)) => {
                    connection.close();
                    let error = ChannelError::from_payload(&data, "server error");
                    return self.step(StateInput::Failed(error));
                }
                Some(ChannelInput::NewAlert(alert)) => self.deliver(AlertEvent::NewAlert(alert)),
                Some(ChannelInput::AlertResolved(resolved)) => {
                    self.deliver(AlertEvent::AlertResolved(resolved))
                }
            }
        }
    }

    fn step(&self, input: StateInput) -> Option<Transition> {
        let transition = {
            let mut shared = lock(&self.shared);
            if shared.generation != self.generation {
                return None;
            }
            let transition = shared.machine.apply(input, &self.policy)?;
            if transition.to == ConnectionState::Error {
                if let Some(error) = &shared.machine.last_error {
                    warn!(error = %error.message(), "⚠️ Realtime channel error");
                }
            }
            transition
        };

        if transition.changed() {
            match transition.to {
                ConnectionState::Authenticated => info!("✅ Realtime channel authenticated"),
                ConnectionState::Disconnected => info!("🔌 Realtime channel disconnected"),
                to => debug!(from = %transition.from, %to, "Realtime channel state changed"),
            }
            self.notifications
                .publish(ChannelNotification::state_changed(transition.from, transition.to));
        }
        Some(transition)
    }

    fn deliver(&self, event: AlertEvent) {
        {
            let shared = lock(&self.shared);
            if shared.generation != self.generation {
                return;
            }
            if !shared.machine.accepts_alerts() {
                debug!(
                    event = event.event_type(),
                    state = %shared.machine.state,
                    "Alert dropped before authentication"
                );
                return;
            }
        }
        metrics::counter!("monitor_alerts_received_total", "kind" => event.event_type())
            .increment(1);
        self.alerts.publish(event);
    }

    fn attempts(&self) -> u32 {
        lock(&self.shared).machine.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use crate::application::testing::{FakeTransport, Script};
    use crate::domain::{AlertResolved, NewAlert};

    fn channel(transport: &Arc<FakeTransport>) -> RealtimeChannel {
        RealtimeChannel::new(transport.clone(), ReconnectPolicy::default())
    }

    async fn wait_for(channel: &RealtimeChannel, state: ConnectionState) {
        for _ in 0..3000 {
            if channel.state() == state {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("channel never reached {}, stuck in {}", state, channel.state());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_error_then_connect_clears_error() {
        let transport = Arc::new(FakeTransport::default());
        transport.push(Script::Fail(ChannelError::Transport("timeout".into())));
        let tx = transport.accept();
        tx.send(ChannelInput::Connect).await.unwrap();

        let channel = channel(&transport);
        channel.open("tok").unwrap();

        wait_for(&channel, ConnectionState::Error).await;
        let message = channel.error_message().unwrap();
        assert!(message.contains("timeout"), "{}", message);

        wait_for(&channel, ConnectionState::Connected).await;
        assert_eq!(channel.last_error(), None);
        assert_eq!(transport.opens(), 2);
        channel.close();
    }

    #[tokio::test(start_paused = true)]
    async fn alerts_flow_only_after_authentication_in_order() {
        let transport = Arc::new(FakeTransport::default());
        let tx = transport.accept();
        let channel = channel(&transport);
        let mut alerts = channel.alerts();
        channel.open("tok").unwrap();

        tx.send(ChannelInput::Connect).await.unwrap();
        tx.send(ChannelInput::NewAlert(NewAlert::new(json!({"id": 0})))).await.unwrap();
        tx.send(ChannelInput::Connected { user: None }).await.unwrap();
        for id in 1..=3 {
            tx.send(ChannelInput::NewAlert(NewAlert::new(json!({"id": id}))))
                .await
                .unwrap();
        }
        tx.send(ChannelInput::AlertResolved(AlertResolved {
            alert_id: "2".into(),
            resolved: true,
        }))
        .await
        .unwrap();

        let mut received = Vec::new();
        for _ in 0..4 {
            let event = tokio::time::timeout(Duration::from_secs(1), alerts.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(event);
        }
        assert_eq!(channel.state(), ConnectionState::Authenticated);
        let ids: Vec<String> = received
            .iter()
            .map(|e| match e {
                AlertEvent::NewAlert(a) => a.id().unwrap(),
                AlertEvent::AlertResolved(r) => format!("resolved:{}", r.alert_id),
            })
            .collect();
        assert_eq!(ids, vec!["1", "2", "3", "resolved:2"]);
        channel.close();
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_idempotent_and_cancels_pending_retry() {
        let transport = Arc::new(FakeTransport::default());
        let channel = channel(&transport);
        let mut notifications = channel.notifications();
        channel.open("tok").unwrap();

        wait_for(&channel, ConnectionState::Error).await;
        assert_eq!(channel.snapshot().next_delay, Some(Duration::from_secs(1)));

        channel.close();
        channel.close();
        assert_eq!(channel.state(), ConnectionState::Closed);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.opens(), 1);

        let mut closed = 0;
        while let Some(ChannelNotification::StateChanged { to, .. }) = notifications.try_recv() {
            if to == ConnectionState::Closed {
                closed += 1;
            }
        }
        assert_eq!(closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_rejection_stops_retrying() {
        let transport = Arc::new(FakeTransport::default());
        transport.push(Script::Fail(ChannelError::Auth("invalid token".into())));
        let channel = channel(&transport);
        channel.open("expired").unwrap();

        wait_for(&channel, ConnectionState::Error).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.opens(), 1);
        assert!(channel.last_error().unwrap().is_auth());
    }

    #[tokio::test(start_paused = true)]
    async fn server_hang_up_with_auth_reason_stops_retrying() {
        let transport = Arc::new(FakeTransport::default());
        let mut senders = Vec::new();
        for _ in 0..40 {
            let tx = transport.accept();
            tx.send(ChannelInput::Connect).await.unwrap();
            tx.send(ChannelInput::Disconnect { reason: "unauthorized".into() })
                .await
                .unwrap();
            senders.push(tx);
        }
        let channel = channel(&transport);
        channel.open("revoked").unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.opens(), 1);
        assert_eq!(channel.state(), ConnectionState::Error);
        assert_eq!(channel.last_error(), Some(ChannelError::Auth("unauthorized".into())));
        channel.close();
    }

    #[tokio::test(start_paused = true)]
    async fn connect_then_failure_cycles_stay_within_budget() {
        let transport = Arc::new(FakeTransport::default());
        let mut senders = Vec::new();
        for _ in 0..40 {
            let tx = transport.accept();
            tx.send(ChannelInput::Connect).await.unwrap();
            tx.send(ChannelInput::ServerError(json!({"message": "ping timeout"})))
                .await
                .unwrap();
            senders.push(tx);
        }
        let channel = channel(&transport);
        channel.open("tok").unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.opens(), 6);
        assert_eq!(channel.state(), ConnectionState::Error);
        assert_eq!(
            channel.last_error(),
            Some(ChannelError::Transport("ping timeout".into()))
        );
        channel.close();
    }

    #[tokio::test(start_paused = true)]
    async fn error_frame_with_401_is_an_auth_rejection() {
        let transport = Arc::new(FakeTransport::default());
        let tx = transport.accept();
        let _spare = transport.accept();
        tx.send(ChannelInput::Connect).await.unwrap();
        tx.send(ChannelInput::ServerError(
            json!({"message": "Authentication failed", "status": 401}),
        ))
        .await
        .unwrap();
        let channel = channel(&transport);
        channel.open("tok").unwrap();

        wait_for(&channel, ConnectionState::Error).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.opens(), 1);
        assert_eq!(
            channel.last_error(),
            Some(ChannelError::Auth("Authentication failed".into()))
        );
        assert!(channel.error_message().unwrap().contains("authentication"));
        channel.close();
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let transport = Arc::new(FakeTransport::default());
        let channel = channel(&transport);
        channel.open("tok").unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.opens(), 6);
        assert_eq!(channel.state(), ConnectionState::Error);
        channel.close();
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_attempt_times_out() {
        let transport = Arc::new(FakeTransport::default());
        transport.push(Script::Hang);
        let channel = channel(&transport);
        channel.open("tok").unwrap();

        wait_for(&channel, ConnectionState::Error).await;
        assert!(channel.error_message().unwrap().contains("timed out"));
        channel.close();
    }

    #[tokio::test]
    async fn empty_credential_is_rejected() {
        let transport = Arc::new(FakeTransport::default());
        let channel = channel(&transport);
        assert!(channel.open("  ").is_err());
        assert_eq!(channel.state(), ConnectionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_after_authentication_reconnects() {
        let transport = Arc::new(FakeTransport::default());
        let first = transport.accept();
        let second = transport.accept();
        let channel = channel(&transport);
        channel.open("tok").unwrap();

        first.send(ChannelInput::Connect).await.unwrap();
        first.send(ChannelInput::Connected { user: None }).await.unwrap();
        wait_for(&channel, ConnectionState::Authenticated).await;

        first
            .send(ChannelInput::Disconnect { reason: "io error".into() })
            .await
            .unwrap();
        wait_for(&channel, ConnectionState::Disconnected).await;

        second.send(ChannelInput::Connect).await.unwrap();
        second.send(ChannelInput::Connected { user: None }).await.unwrap();
        wait_for(&channel, ConnectionState::Authenticated).await;
        assert_eq!(transport.opens(), 2);
        assert_eq!(transport.tokens.lock().unwrap()[1], "tok");
        channel.close();
    }
}
