//! Domain events
//!
//! Event types that represent facts about what happened in the client.
//! The EventBus implementation lives in `application::events`.

pub mod types;

pub use types::{ChannelNotification, LogoutReason, SessionEvent};
