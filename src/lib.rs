//! # Crossing Monitor Client
//!
//! Session, authorization and real-time alert client for the railway
//! crossing monitoring dashboard.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: users, roles, capabilities, sessions, alerts, errors
//! - **application**: session service, role gate, inactivity monitor,
//!   realtime channel and the ports they depend on
//! - **infrastructure**: reqwest auth client, session storage,
//!   tungstenite transport, JWT inspection
//! - **shared**: rate limiter, scheduler, shutdown signal, validation
//! - **runtime**: [`ClientHandle`] wiring everything from an [`AppConfig`]

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod runtime;
pub mod shared;

pub use config::{default_config_path, init_tracing, AppConfig};
pub use runtime::{ClientHandle, ClientOptions};

pub use application::{
    ActivityFeed, ActivitySignal, GateDecision, InactivityMonitor, RealtimeChannel, RoleGate,
    SessionService, SharedSessionService, View,
};
pub use domain::{
    AlertEvent, Capability, ClientError, ClientResult, ConnectionState, LogoutReason,
    SessionEvent, User, UserRole,
};
pub use shared::RateLimiter;
