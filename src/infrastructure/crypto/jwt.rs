//! JWT inspection
//!
//! The client never holds the signing key. It only reads the claims of the
//! access token it was issued, to drop a persisted credential that has
//! already expired. Opaque (non-JWT) tokens are left to the backend.

use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims the client cares about. Everything is optional since the
/// backend's token layout is not part of the contract.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TokenClaims {
    /// Subject (user ID)
    #[serde(default)]
    pub sub: Option<serde_json::Value>,
    /// Expiration time (Unix timestamp)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
}

impl TokenClaims {
    /// Check if the token is expired. Tokens without `exp` never are.
    pub fn is_expired(&self) -> bool {
        self.exp.is_some_and(|exp| Utc::now().timestamp() >= exp)
    }
}

/// Decode the claims without verifying the signature.
pub fn inspect_token(token: &str) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(token_data.claims)
}

/// `Some(true)` for a JWT whose `exp` has passed, `None` when the token
/// cannot be read as a JWT.
pub fn token_expired(token: &str) -> Option<bool> {
    inspect_token(token).ok().map(|claims| claims.is_expired())
}
