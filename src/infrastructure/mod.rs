//! Infrastructure layer - external concerns
//!
//! Adapters for the application ports: HTTP auth client, session
//! storage, WebSocket transport, and credential inspection.

pub mod crypto;
pub mod http;
pub mod realtime;
pub mod storage;

pub use http::HttpAuthApi;
pub use realtime::WsTransport;
pub use storage::{FileSessionStorage, MemorySessionStorage};
