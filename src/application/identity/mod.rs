//! Identity module: session, permissions and view gating
//!
//! `SessionService` orchestrates login, logout and profile use-cases.
//! `permissions` is the pure role → capability mapping and `RoleGate`
//! answers "may the current user do this?" for front ends.

pub mod permissions;
pub mod role_gate;
pub mod service;

pub use role_gate::{GateDecision, RoleGate, View};
pub use service::{SessionService, SharedSessionService};
