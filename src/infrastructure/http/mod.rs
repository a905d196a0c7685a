//! HTTP adapter for the auth boundary

mod auth_client;
mod dto;

pub use auth_client::HttpAuthApi;
