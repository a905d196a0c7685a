//! Realtime alert delivery

pub mod channel;
pub mod policy;
pub mod state;

pub use channel::RealtimeChannel;
pub use policy::ReconnectPolicy;
pub use state::{ChannelState, StateInput, Transition};
