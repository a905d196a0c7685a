//! Application layer - use cases over the ports
//!
//! - **identity**: session service, permission resolution, view gating
//! - **activity**: inactivity detection and forced logout
//! - **realtime**: alert channel with reconnect state machine
//! - **events**: broadcast event bus with unsubscribe handles
//! - **ports**: boundaries implemented by `infrastructure`

pub mod activity;
pub mod events;
pub mod identity;
pub mod ports;
pub mod realtime;

#[cfg(test)]
pub(crate) mod testing;

pub use activity::{ActivityFeed, ActivitySignal, InactivityConfig, InactivityMonitor, MonitorState};
pub use events::{EventBus, EventSubscriber, Subscription};
pub use identity::{permissions, GateDecision, RoleGate, SessionService, SharedSessionService, View};
pub use ports::{
    AuthApi, ChannelInput, LoginResponse, NavigationLog, Navigator, RealtimeConnection,
    RealtimeTransport, SessionStorage,
};
pub use realtime::{ChannelState, RealtimeChannel, ReconnectPolicy};
