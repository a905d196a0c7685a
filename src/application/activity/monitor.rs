//! Inactivity Monitor
//!
//! Forces a logout once the user has been idle for the configured period.
//! Every accepted activity signal cancels the pending timeout and schedules
//! a fresh one, so at most one timeout is ever pending.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::application::events::Subscription;
use crate::application::identity::SessionService;
use crate::application::ports::Navigator;
use crate::domain::{LogoutReason, SessionEvent};
use crate::shared::scheduler::{Scheduler, TimerHandle};

use super::signals::{ActivityFeed, ActivitySignal};

/// Configuration for inactivity monitoring
#[derive(Debug, Clone)]
pub struct InactivityConfig {
    /// Idle period before the session is ended
    pub timeout: Duration,
    /// Signal kinds that count as activity
    pub signals: HashSet<ActivitySignal>,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30 * 60),
            signals: ActivitySignal::ALL.into_iter().collect(),
        }
    }
}

impl InactivityConfig {
    pub fn from_minutes(minutes: u64) -> Self {
        Self {
            timeout: Duration::from_secs(minutes * 60),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Running,
    /// The timeout fired and the forced logout was issued.
    Expired,
}

struct ActivityState {
    state: MonitorState,
    pending: Option<TimerHandle>,
    last_activity: Option<Instant>,
    /// Bumped on every (re)schedule so a stale timer is a no-op.
    generation: u64,
    listener: Option<JoinHandle<()>>,
}

struct Shared {
    config: InactivityConfig,
    scheduler: Arc<dyn Scheduler>,
    session: Arc<SessionService>,
    navigator: Arc<dyn Navigator>,
    feed: Option<ActivityFeed>,
    activity: Mutex<ActivityState>,
}

/// Inactivity Monitor Service
///
/// Cheap to clone; clones share the same timer and state.
#[derive(Clone)]
pub struct InactivityMonitor {
    shared: Arc<Shared>,
}

impl InactivityMonitor {
    pub fn new(
        session: Arc<SessionService>,
        scheduler: Arc<dyn Scheduler>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::build(session, scheduler, navigator, InactivityConfig::default(), None)
    }

    pub fn with_config(self, config: InactivityConfig) -> Self {
        let shared = &self.shared;
        Self::build(
            shared.session.clone(),
            shared.scheduler.clone(),
            shared.navigator.clone(),
            config,
            shared.feed.clone(),
        )
    }

    /// Listen to `feed` while running.
    pub fn with_feed(self, feed: ActivityFeed) -> Self {
        let shared = &self.shared;
        Self::build(
            shared.session.clone(),
            shared.scheduler.clone(),
            shared.navigator.clone(),
            shared.config.clone(),
            Some(feed),
        )
    }

    fn build(
        session: Arc<SessionService>,
        scheduler: Arc<dyn Scheduler>,
        navigator: Arc<dyn Navigator>,
        config: InactivityConfig,
        feed: Option<ActivityFeed>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                scheduler,
                session,
                navigator,
                feed,
                activity: Mutex::new(ActivityState {
                    state: MonitorState::Stopped,
                    pending: None,
                    last_activity: None,
                    generation: 0,
                    listener: None,
                }),
            }),
        }
    }

    pub fn config(&self) -> &InactivityConfig {
        &self.shared.config
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Begin watching. Restarting an already running monitor re-arms it.
    /// Without a session the monitor stays stopped.
    pub fn start(&self) {
        if !self.shared.session.is_authenticated() {
            debug!("Inactivity monitor not started: no active session");
            return;
        }

        let mut activity = self.lock();
        activity.state = MonitorState::Running;
        self.arm(&mut activity);

        if activity.listener.is_none() {
            if let Some(feed) = &self.shared.feed {
                activity.listener = Some(self.spawn_listener(feed));
            }
        }

        info!(
            timeout_secs = self.shared.config.timeout.as_secs(),
            "⏱️ Inactivity monitor started"
        );
    }

    /// Cancel the pending timeout and detach from the activity feed.
    pub fn stop(&self) {
        let mut activity = self.lock();
        self.disarm(&mut activity);
        if let Some(listener) = activity.listener.take() {
            listener.abort();
        }
        if activity.state == MonitorState::Running {
            activity.state = MonitorState::Stopped;
            debug!("Inactivity monitor stopped");
        }
    }

    /// Follow the session: start on login or restore, stop on logout.
    pub fn watch_session(&self) -> Subscription {
        let monitor = self.clone();
        self.shared.session.subscribe(move |event| match event {
            event if event.starts_session() => monitor.start(),
            SessionEvent::LoggedOut { .. } => monitor.stop(),
            _ => {}
        })
    }

    // ── Activity ───────────────────────────────────────────────

    /// Returns whether the signal reset the timeout. Signals of a kind not
    /// in the configured set, or arriving while not running, are ignored.
    pub fn record_activity(&self, signal: ActivitySignal) -> bool {
        if !self.shared.config.signals.contains(&signal) {
            trace!(%signal, "Ignoring activity signal");
            return false;
        }

        let mut activity = self.lock();
        if activity.state != MonitorState::Running {
            return false;
        }
        self.arm(&mut activity);
        trace!(%signal, "Activity recorded");
        true
    }

    pub fn state(&self) -> MonitorState {
        self.lock().state
    }

    pub fn has_pending_timeout(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.lock().last_activity
    }

    /// When the session will be ended if nothing else happens.
    pub fn deadline(&self) -> Option<Instant> {
        let activity = self.lock();
        match activity.state {
            MonitorState::Running => activity.last_activity.map(|t| t + self.shared.config.timeout),
            _ => None,
        }
    }

    // ── Internals ──────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, ActivityState> {
        self.shared
            .activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cancel-before-reschedule.
    fn arm(&self, activity: &mut ActivityState) {
        self.disarm(activity);
        activity.generation += 1;
        activity.last_activity = Some(Instant::now());

        let generation = activity.generation;
        let shared = self.shared.clone();
        let handle = self.shared.scheduler.schedule(
            self.shared.config.timeout,
            Box::new(move || expire(shared, generation)),
        );
        activity.pending = Some(handle);
    }

    fn disarm(&self, activity: &mut ActivityState) {
        if let Some(handle) = activity.pending.take() {
            self.shared.scheduler.cancel(handle);
        }
        activity.generation += 1;
    }

    fn spawn_listener(&self, feed: &ActivityFeed) -> JoinHandle<()> {
        let mut signals = feed.subscribe();
        let monitor = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                let Some(shared) = monitor.upgrade() else {
                    break;
                };
                InactivityMonitor { shared }.record_activity(signal);
            }
        })
    }
}

fn expire(shared: Arc<Shared>, generation: u64) {
    {
        let mut activity = shared
            .activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if activity.generation != generation || activity.state != MonitorState::Running {
            return;
        }
        activity.state = MonitorState::Expired;
        activity.pending = None;
        if let Some(listener) = activity.listener.take() {
            listener.abort();
        }
    }

    info!(
        idle_secs = shared.config.timeout.as_secs(),
        "⏱️ Session idle, logging out"
    );
    tokio::spawn(async move {
        shared.session.logout_with(LogoutReason::Inactivity).await;
        shared.navigator.navigate_to_login();
    });
}
