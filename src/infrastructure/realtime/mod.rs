//! Realtime transport adapters

pub mod frames;
mod ws_transport;

pub use ws_transport::WsTransport;
