//! Application ports (hexagonal architecture boundaries)
//!
//! Outbound ports the services depend on. Adapters live in
//! `infrastructure`.

pub mod auth;
pub mod navigation;
pub mod realtime;
pub mod storage;

pub use auth::{AuthApi, LoginResponse};
pub use navigation::{NavigationLog, Navigator};
pub use realtime::{ChannelInput, RealtimeConnection, RealtimeTransport};
pub use storage::SessionStorage;
