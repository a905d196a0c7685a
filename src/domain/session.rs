//! Authenticated session and its persisted form

use serde::{Deserialize, Serialize};

use super::user::User;

/// Access + refresh credential pair issued at login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access", &"***")
            .field("refresh", &"***")
            .finish()
    }
}

/// Current identity plus credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub tokens: AuthTokens,
}

impl Session {
    pub fn new(user: User, tokens: AuthTokens) -> Self {
        Self { user, tokens }
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access
    }

    pub fn refresh_token(&self) -> &str {
        &self.tokens.refresh
    }

    pub fn has_credential(&self) -> bool {
        !self.tokens.access.is_empty()
    }
}

/// Storage record. Field names match the dashboard's storage keys.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub user: Option<User>,
}

impl std::fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedSession")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("user", &self.user)
            .finish()
    }
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.tokens.access.clone(),
            refresh_token: session.tokens.refresh.clone(),
            user: Some(session.user.clone()),
        }
    }
}

impl PersistedSession {
    /// A usable session needs both a credential and an identity.
    pub fn into_session(self) -> Option<Session> {
        if self.access_token.is_empty() {
            return None;
        }
        let user = self.user?;
        Some(Session::new(
            user,
            AuthTokens {
                access: self.access_token,
                refresh: self.refresh_token,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;

    fn session() -> Session {
        Session::new(
            User::new("1", "ops@rail.cl", UserRole::Admin),
            AuthTokens {
                access: "acc".into(),
                refresh: "ref".into(),
            },
        )
    }

    #[test]
    fn persisted_record_uses_storage_key_names() {
        let json = serde_json::to_value(PersistedSession::from(&session())).unwrap();
        assert_eq!(json["accessToken"], "acc");
        assert_eq!(json["refreshToken"], "ref");
        assert_eq!(json["user"]["email"], "ops@rail.cl");
    }

    #[test]
    fn record_without_user_or_token_is_not_a_session() {
        let mut record = PersistedSession::from(&session());
        record.user = None;
        assert!(record.into_session().is_none());

        let mut record = PersistedSession::from(&session());
        record.access_token.clear();
        assert!(record.into_session().is_none());

        assert_eq!(
            PersistedSession::from(&session()).into_session(),
            Some(session())
        );
    }

    #[test]
    fn debug_output_hides_tokens() {
        let rendered = format!("{:?}", session());
        assert!(!rendered.contains("acc\""));
        assert!(rendered.contains("***"));
    }
}
