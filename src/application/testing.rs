//! In-crate fakes for the ports.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::identity::SessionService;
use crate::application::ports::{
    AuthApi, ChannelInput, LoginResponse, Navigator, RealtimeConnection, RealtimeTransport,
};
use crate::application::realtime::{RealtimeChannel, ReconnectPolicy};
use crate::infrastructure::storage::MemorySessionStorage;
use crate::shared::rate_limit::RateLimiter;
use crate::domain::{
    AuthError, ChannelError, ClientError, ClientResult, NetworkError, UpdateUserDto, User, UserRole,
};
use crate::shared::validations::{ChangePasswordForm, LoginForm};

// ── Transport ──────────────────────────────────────────────────

pub enum Script {
    Fail(ChannelError),
    Hang,
    Accept(mpsc::Receiver<ChannelInput>),
}

/// Plays back scripted connection attempts. With nothing scripted every
/// attempt is refused.
#[derive(Default)]
pub struct FakeTransport {
    scripts: Mutex<VecDeque<Script>>,
    pub tokens: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn accept(&self) -> mpsc::Sender<ChannelInput> {
        let (tx, rx) = mpsc::channel(16);
        self.push(Script::Accept(rx));
        tx
    }

    pub fn opens(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl RealtimeTransport for FakeTransport {
    async fn open(&self, token: &str) -> Result<RealtimeConnection, ChannelError> {
        self.tokens.lock().unwrap().push(token.to_string());
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Accept(rx)) => Ok(RealtimeConnection::new(rx, || {})),
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Hang) => std::future::pending().await,
            None => Err(ChannelError::Transport("connection refused".into())),
        }
    }
}

// ── Auth ───────────────────────────────────────────────────────

pub const ACCESS_TOKEN: &str = "access-token";
pub const PASSWORD: &str = "correct-horse";

/// Accepts [`PASSWORD`] for any email and answers as `user`.
pub struct FakeAuthApi {
    pub user: Mutex<User>,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub password_changes: AtomicUsize,
    pub fail_logout: AtomicBool,
    pub reject_token: AtomicBool,
}

impl FakeAuthApi {
    pub fn new(role: UserRole) -> Self {
        Self {
            user: Mutex::new(User::new("17", "ops@rail.cl", role)),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            password_changes: AtomicUsize::new(0),
            fail_logout: AtomicBool::new(false),
            reject_token: AtomicBool::new(false),
        }
    }

    pub fn shared(role: UserRole) -> Arc<Self> {
        Arc::new(Self::new(role))
    }

    fn authorize(&self, token: &str) -> ClientResult<()> {
        if token != ACCESS_TOKEN || self.reject_token.load(Ordering::SeqCst) {
            return Err(AuthError::Unauthorized("token expired".into()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, form: &LoginForm) -> ClientResult<LoginResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if form.password != PASSWORD {
            return Err(AuthError::InvalidCredentials.into());
        }
        let mut user = self.user.lock().unwrap().clone();
        user.email = form.email.clone();
        Ok(LoginResponse {
            access: ACCESS_TOKEN.to_string(),
            refresh: "refresh-token".to_string(),
            user,
        })
    }

    async fn logout(&self, _access_token: &str, _refresh_token: &str) -> ClientResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_logout.load(Ordering::SeqCst) {
            return Err(ClientError::Network(NetworkError::Unreachable("offline".into())));
        }
        Ok(())
    }

    async fn get_profile(&self, access_token: &str) -> ClientResult<User> {
        self.authorize(access_token)?;
        Ok(self.user.lock().unwrap().clone())
    }

    async fn update_profile(&self, access_token: &str, update: &UpdateUserDto) -> ClientResult<User> {
        self.authorize(access_token)?;
        let mut user = self.user.lock().unwrap();
        update.apply_to(&mut user);
        Ok(user.clone())
    }

    async fn change_password(&self, access_token: &str, _form: &ChangePasswordForm) -> ClientResult<()> {
        self.authorize(access_token)?;
        self.password_changes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Navigation ─────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNavigator {
    pub calls: AtomicUsize,
}

impl RecordingNavigator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to_login(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Wiring ─────────────────────────────────────────────────────

/// A session service over fakes, with a channel whose dials are refused.
pub fn session_service(role: UserRole) -> (Arc<SessionService>, Arc<FakeAuthApi>) {
    let api = FakeAuthApi::shared(role);
    let channel = Arc::new(RealtimeChannel::new(
        Arc::new(FakeTransport::default()),
        ReconnectPolicy::default(),
    ));
    let service = SessionService::new(
        api.clone(),
        Arc::new(MemorySessionStorage::new()),
        channel,
        RateLimiter::new("login", 100, std::time::Duration::from_secs(60)),
    );
    (Arc::new(service), api)
}
