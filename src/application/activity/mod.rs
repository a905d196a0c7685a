//! Idle-session detection

pub mod monitor;
pub mod signals;

pub use monitor::{InactivityConfig, InactivityMonitor, MonitorState};
pub use signals::{ActivityFeed, ActivitySignal};
