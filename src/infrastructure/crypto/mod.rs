//! Credential inspection

pub mod jwt;

pub use jwt::{inspect_token, token_expired, TokenClaims};
