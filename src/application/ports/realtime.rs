//! Realtime transport port
//!
//! A transport opens one connection per attempt and reports what happens
//! on it as a stream of [`ChannelInput`]s. Reconnection and state tracking
//! belong to the channel, not the transport.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::{AlertResolved, ChannelError, NewAlert, User};

/// Inbound events from one transport connection, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelInput {
    /// Transport-level connection established.
    Connect,
    /// Server accepted the credential.
    Connected { user: Option<User> },
    Disconnect { reason: String },
    ConnectError(ChannelError),
    /// Server-side `error` frame.
    ServerError(Value),
    NewAlert(NewAlert),
    AlertResolved(AlertResolved),
}

impl ChannelInput {
    pub fn name(&self) -> &'static str {
        match self {
            ChannelInput::Connect => "connect",
            ChannelInput::Connected { .. } => "connected",
            ChannelInput::Disconnect { .. } => "disconnect",
            ChannelInput::ConnectError(_) => "connect_error",
            ChannelInput::ServerError(_) => "error",
            ChannelInput::NewAlert(_) => "new_alert",
            ChannelInput::AlertResolved(_) => "alert_resolved",
        }
    }
}

/// A live connection. Dropping it (or calling `close`) tears the transport
/// down; `events` ends when the connection is gone.
pub struct RealtimeConnection {
    pub events: mpsc::Receiver<ChannelInput>,
    closer: Option<Box<dyn FnOnce() + Send>>,
}

impl RealtimeConnection {
    pub fn new(events: mpsc::Receiver<ChannelInput>, closer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            events,
            closer: Some(Box::new(closer)),
        }
    }

    pub fn close(&mut self) {
        if let Some(closer) = self.closer.take() {
            closer();
        }
    }
}

impl Drop for RealtimeConnection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RealtimeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConnection")
            .field("open", &self.closer.is_some())
            .finish()
    }
}

#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Open a connection presenting `token`. Failures to establish the
    /// connection come back as `Err`; everything after that arrives on
    /// the event stream.
    async fn open(&self, token: &str) -> Result<RealtimeConnection, ChannelError>;
}
