use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Transport-level failures talking to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("request timed out")]
    Timeout,

    #[error("server unreachable: {0}")]
    Unreachable(String),

    #[error("server responded with status {status}")]
    Server { status: u16 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Credential rejections returned by the auth boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// Realtime channel failures, split by origin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("connection error: {0}")]
    Transport(String),

    #[error("authentication error: {0}")]
    Auth(String),
}

/// Substrings that mark a server rejection as an authentication failure.
const AUTH_MARKERS: [&str; 5] = ["unauthorized", "forbidden", "authentication", "invalid token", "jwt"];

impl ChannelError {
    /// Split a server-supplied rejection into auth vs transport. A 401/403
    /// status or an auth-flavoured message means the credential was refused.
    pub fn classify(message: impl Into<String>, status: Option<u64>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        let auth = matches!(status, Some(401 | 403))
            || AUTH_MARKERS.iter().any(|marker| lowered.contains(marker));

        if auth {
            ChannelError::Auth(message)
        } else {
            ChannelError::Transport(message)
        }
    }

    /// Classify a `connect_error` or `error` frame payload.
    pub fn from_payload(data: &Value, fallback: &str) -> Self {
        let message = payload_text(data).unwrap_or_else(|| match data {
            Value::Null => fallback.to_string(),
            Value::Object(map) if map.is_empty() => fallback.to_string(),
            other => other.to_string(),
        });
        let status = data
            .get("status")
            .or_else(|| data.get("code"))
            .and_then(Value::as_u64);
        Self::classify(message, status)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ChannelError::Auth(_))
    }

    /// Readable text for the UI status line.
    pub fn message(&self) -> String {
        match self {
            ChannelError::Transport(detail) => {
                format!("Realtime connection failed: {}", detail)
            }
            ChannelError::Auth(detail) => {
                format!("Realtime authentication rejected: {}", detail)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("rate limited, retry in {}ms", retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("Validation: {0}")]
    Validation(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Message suitable for showing to the operator.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(NetworkError::Timeout) => {
                "The server took too long to respond. Try again.".to_string()
            }
            ClientError::Network(NetworkError::Unreachable(_)) => {
                "Cannot reach the server. Check your connection.".to_string()
            }
            ClientError::Network(NetworkError::Server { status }) => {
                format!("The server failed to process the request ({}).", status)
            }
            ClientError::Network(NetworkError::InvalidResponse(_)) => {
                "The server sent an unexpected response.".to_string()
            }
            ClientError::Auth(AuthError::InvalidCredentials) => {
                "Invalid email or password.".to_string()
            }
            ClientError::Auth(AuthError::Unauthorized(_)) => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ClientError::Auth(AuthError::Forbidden(_)) => {
                "You do not have permission to perform this action.".to_string()
            }
            ClientError::RateLimited { retry_after } => format!(
                "Too many attempts. Please wait {} seconds and try again.",
                retry_after.as_secs().max(1)
            ),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Channel(err) => err.message(),
            ClientError::Storage(_) => "Local session storage is unavailable.".to_string(),
            ClientError::Config(msg) => format!("Invalid configuration: {}", msg),
        }
    }

    /// Whether the credential itself was rejected and the session must end.
    pub fn is_credential_rejected(&self) -> bool {
        matches!(self, ClientError::Auth(AuthError::Unauthorized(_)))
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Network(NetworkError::Timeout)
                | ClientError::Network(NetworkError::Unreachable(_))
                | ClientError::RateLimited { .. }
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Human text carried by a frame payload: the string itself, or its
/// `message`/`reason` field.
pub fn payload_text(data: &Value) -> Option<String> {
    match data {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("reason"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_errors_have_distinct_messages() {
        let transport = ChannelError::Transport("timeout".into());
        let auth = ChannelError::Auth("timeout".into());
        assert_ne!(transport.message(), auth.message());
        assert!(auth.is_auth());
        assert!(!transport.is_auth());
    }

    #[test]
    fn rejections_are_split_by_status_and_message() {
        assert!(ChannelError::classify("nope", Some(401)).is_auth());
        assert!(ChannelError::classify("Invalid token", None).is_auth());
        assert!(ChannelError::classify("JWT expired", Some(500)).is_auth());
        assert!(!ChannelError::classify("ping timeout", None).is_auth());
        assert!(!ChannelError::classify("bad gateway", Some(502)).is_auth());
    }

    #[test]
    fn error_payloads_fall_back_to_readable_text() {
        let payload = serde_json::json!({"message": "Authentication failed", "status": 401});
        let err = ChannelError::from_payload(&payload, "server error");
        assert_eq!(err, ChannelError::Auth("Authentication failed".into()));
        assert_eq!(
            ChannelError::from_payload(&Value::Null, "server error"),
            ChannelError::Transport("server error".into())
        );
        assert_eq!(
            ChannelError::from_payload(&serde_json::json!({"code": 403}), "server error"),
            ChannelError::Auth(r#"{"code":403}"#.into())
        );
    }

    #[test]
    fn rate_limited_message_never_says_zero_seconds() {
        let err = ClientError::RateLimited {
            retry_after: Duration::from_millis(200),
        };
        assert!(err.user_message().contains("1 seconds"));
        assert!(err.is_transient());
    }

    #[test]
    fn only_unauthorized_rejects_the_credential() {
        assert!(ClientError::from(AuthError::Unauthorized("expired".into())).is_credential_rejected());
        assert!(!ClientError::from(AuthError::Forbidden("role".into())).is_credential_rejected());
        assert!(!ClientError::from(AuthError::InvalidCredentials).is_credential_rejected());
    }
}
