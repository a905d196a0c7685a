pub mod alert;
pub mod capability;
pub mod connection;
pub mod events;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use alert::{AlertEvent, AlertResolved, NewAlert};
pub use capability::{Capability, CapabilitySet, UnknownCapability};
pub use connection::ConnectionState;
pub use events::{ChannelNotification, LogoutReason, SessionEvent};
pub use session::{AuthTokens, PersistedSession, Session};
pub use user::{UpdateUserDto, User, UserRole};

// Re-export the error taxonomy for convenience
pub use crate::shared::types::errors::{
    AuthError, ChannelError, ClientError, ClientResult, NetworkError,
};
