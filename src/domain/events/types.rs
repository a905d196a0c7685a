//! Client events
//!
//! Facts published by the session service and the realtime channel.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::connection::ConnectionState;
use crate::domain::user::User;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    Manual,
    Inactivity,
    /// The backend rejected the access credential.
    CredentialRejected,
}

impl LogoutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoutReason::Manual => "manual",
            LogoutReason::Inactivity => "inactivity",
            LogoutReason::CredentialRejected => "credential_rejected",
        }
    }
}

impl std::fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    LoggedIn { user: User },
    Restored { user: User },
    UserUpdated { user: User },
    LoggedOut { reason: LogoutReason },
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::LoggedIn { .. } => "logged_in",
            SessionEvent::Restored { .. } => "restored",
            SessionEvent::UserUpdated { .. } => "user_updated",
            SessionEvent::LoggedOut { .. } => "logged_out",
        }
    }

    /// LoggedIn and Restored both begin an authenticated period.
    pub fn starts_session(&self) -> bool {
        matches!(self, SessionEvent::LoggedIn { .. } | SessionEvent::Restored { .. })
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionEvent::LoggedIn { user }
            | SessionEvent::Restored { user }
            | SessionEvent::UserUpdated { user } => Some(user),
            SessionEvent::LoggedOut { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelNotification {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
        timestamp: DateTime<Utc>,
    },
}

impl ChannelNotification {
    pub fn state_changed(from: ConnectionState, to: ConnectionState) -> Self {
        ChannelNotification::StateChanged {
            from,
            to,
            timestamp: Utc::now(),
        }
    }
}
