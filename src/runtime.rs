//! Client runtime
//!
//! Provides [`ClientHandle`], the composition root: it builds the HTTP
//! auth client, session storage, realtime channel, session service,
//! inactivity monitor and role gate from an [`AppConfig`] and owns their
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::application::activity::{ActivityFeed, InactivityMonitor};
use crate::application::events::Subscription;
use crate::application::identity::{RoleGate, SessionService, SharedSessionService};
use crate::application::ports::{NavigationLog, Navigator, SessionStorage};
use crate::application::realtime::RealtimeChannel;
use crate::config::AppConfig;
use crate::domain::{ClientResult, User};
use crate::infrastructure::{FileSessionStorage, HttpAuthApi, WsTransport};
use crate::shared::rate_limit::RateLimiter;
use crate::shared::scheduler::TokioScheduler;
use crate::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the client.
pub struct ClientOptions {
    pub config: AppConfig,
    /// Where forced logouts send the user. Defaults to [`NavigationLog`].
    pub navigator: Option<Arc<dyn Navigator>>,
    /// Overrides the file storage derived from the config.
    pub storage: Option<Arc<dyn SessionStorage>>,
    /// Restore the persisted session on start (default: true).
    pub restore_session: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            navigator: None,
            storage: None,
            restore_session: true,
        }
    }
}

impl ClientOptions {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }
}

// ── ClientHandle ───────────────────────────────────────────────────

/// Handle to a running client.
///
/// ```rust,no_run
/// use crossing_monitor::runtime::{ClientHandle, ClientOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ClientHandle::start(ClientOptions::default()).await?;
///     handle.session.login("ops@rail.cl", "correct-horse").await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ClientHandle {
    pub session: SharedSessionService,
    pub channel: Arc<RealtimeChannel>,
    pub monitor: InactivityMonitor,
    pub gate: RoleGate,
    /// Hosts push input events here.
    pub activity: ActivityFeed,
    pub navigator: Arc<dyn Navigator>,
    /// The configuration the client was started with.
    pub config: AppConfig,
    /// User restored from storage during start, if any.
    pub restored: Option<User>,

    shutdown: ShutdownSignal,
    session_watch: Subscription,
}

impl ClientHandle {
    pub async fn start(opts: ClientOptions) -> ClientResult<Self> {
        let config = opts.config;
        config.validate()?;

        info!(
            version = %config.app.version,
            environment = %config.app.environment,
            "Starting crossing monitor client..."
        );

        // ── Rate limiters ──────────────────────────────────────
        let login_limiter = RateLimiter::new(
            "login",
            config.rate_limit.login_max_requests,
            Duration::from_millis(config.rate_limit.login_window_ms),
        );
        let api_limiter = RateLimiter::new(
            "api",
            config.rate_limit.api_max_requests,
            Duration::from_millis(config.rate_limit.api_window_ms),
        );

        // ── Adapters ───────────────────────────────────────────
        let api = Arc::new(HttpAuthApi::new(
            &config.api.base_url,
            config.api_timeout(),
            api_limiter.clone(),
        )?);
        info!("API: {}", api.base_url());

        let storage = match opts.storage {
            Some(storage) => storage,
            None => {
                let path = config
                    .session
                    .storage_path
                    .clone()
                    .unwrap_or_else(FileSessionStorage::default_path);
                info!("Session file: {}", path.display());
                Arc::new(FileSessionStorage::with_path(path)) as Arc<dyn SessionStorage>
            }
        };

        let transport = Arc::new(WsTransport::new(config.realtime_url(), &config.realtime.path)?);
        info!("Realtime: {}", transport.endpoint());

        // ── Services ───────────────────────────────────────────
        let channel = Arc::new(RealtimeChannel::new(transport, config.reconnect_policy()));
        let session = Arc::new(SessionService::new(
            api,
            storage,
            channel.clone(),
            login_limiter.clone(),
        ));

        let navigator = opts
            .navigator
            .unwrap_or_else(|| Arc::new(NavigationLog::new()) as Arc<dyn Navigator>);
        let activity = ActivityFeed::new();
        let monitor = InactivityMonitor::new(session.clone(), TokioScheduler::shared(), navigator.clone())
            .with_config(config.inactivity())
            .with_feed(activity.clone());
        let session_watch = monitor.watch_session();
        let gate = RoleGate::new(session.clone());

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownSignal::new();
        let every = Duration::from_secs(config.rate_limit.cleanup_interval_secs.max(1));
        login_limiter.spawn_cleanup(every, shutdown.clone());
        api_limiter.spawn_cleanup(every, shutdown.clone());

        // ── Restore ────────────────────────────────────────────
        let restored = if opts.restore_session {
            session.init().await
        } else {
            None
        };
        if let Some(user) = &restored {
            info!(user = %user.email, role = %user.role, "🔑 Session restored");
        }

        info!("🚀 Client started.");

        Ok(Self {
            session,
            channel,
            monitor,
            gate,
            activity,
            navigator,
            config,
            restored,
            shutdown,
            session_watch,
        })
    }

    /// Get a cloneable shutdown signal.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = listen_for_shutdown_signals(shutdown).await {
                error!("Failed to listen for OS signals: {}", e);
            }
        });
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Stop background work and close the channel. The persisted session
    /// stays in place for the next start.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down client...");
        self.shutdown.trigger();

        self.session_watch.unsubscribe();
        self.monitor.stop();
        self.session.dispose();

        info!("✅ Client stopped");
    }
}
