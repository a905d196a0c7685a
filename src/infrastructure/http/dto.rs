//! Wire shapes for the auth endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::User;

#[derive(Debug, Serialize)]
pub struct LogoutRequest<'a> {
    pub refresh: &'a str,
}

/// Profile endpoints answer either `{"user": {...}}` or the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProfileEnvelope {
    Wrapped { user: User },
    Bare(User),
}

impl ProfileEnvelope {
    pub fn into_user(self) -> User {
        match self {
            ProfileEnvelope::Wrapped { user } | ProfileEnvelope::Bare(user) => user,
        }
    }
}

/// Best-effort human message from an error body.
pub fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["message", "error", "detail"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        Ok(Value::String(s)) => Some(s),
        _ => Some(body.chars().take(200).collect()),
    }
}
