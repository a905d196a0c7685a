use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Dashboard role. Anything the backend sends that is not one of these
/// three resolves to [`UserRole::Observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Maintenance,
    Observer,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Observer
    }
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Admin, UserRole::Maintenance, UserRole::Observer];

    /// Lenient parse, case-insensitive, falls back to `Observer`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Self::Admin,
            "MAINTENANCE" => Self::Maintenance,
            "OBSERVER" => Self::Observer,
            _ => Self::Observer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Maintenance => "MAINTENANCE",
            Self::Observer => "OBSERVER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(|v| v.as_str())
            .map(UserRole::parse)
            .unwrap_or_default())
    }
}

/// Authenticated dashboard user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_active", alias = "isActive")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, alias = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            is_active: true,
            username: None,
            first_name: None,
            last_name: None,
            phone: None,
        }
    }

    /// Name for greetings and audit lines: full name, then username, then email.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{} {}", first, last)
            }
            (Some(first), _) if !first.is_empty() => first.clone(),
            _ => self
                .username
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| self.email.clone()),
        }
    }
}

fn default_active() -> bool {
    true
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(UserRole::parse("admin"), UserRole::Admin);
        assert_eq!(UserRole::parse(" Maintenance "), UserRole::Maintenance);
        assert_eq!(UserRole::parse("OBSERVER"), UserRole::Observer);
    }

    #[test]
    fn unknown_role_falls_back_to_observer() {
        assert_eq!(UserRole::parse("superuser"), UserRole::Observer);
        assert_eq!(UserRole::parse(""), UserRole::Observer);
    }

    #[test]
    fn deserialize_user_with_missing_or_bad_role() {
        let missing: User = serde_json::from_str(r#"{"id": 7, "email": "a@b.cl"}"#).unwrap();
        assert_eq!(missing.id, "7");
        assert_eq!(missing.role, UserRole::Observer);
        assert!(missing.is_active);

        let null: User =
            serde_json::from_str(r#"{"id": "u1", "email": "a@b.cl", "role": null}"#).unwrap();
        assert_eq!(null.role, UserRole::Observer);

        let numeric: User =
            serde_json::from_str(r#"{"id": "u1", "email": "a@b.cl", "role": 3}"#).unwrap();
        assert_eq!(numeric.role, UserRole::Observer);

        let admin: User = serde_json::from_str(
            r#"{"id": "u1", "email": "a@b.cl", "role": "admin", "is_active": false}"#,
        )
        .unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(!admin.is_active);
    }

    #[test]
    fn role_serializes_uppercase() {
        let user = User::new("1", "ops@rail.cl", UserRole::Maintenance);
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "MAINTENANCE");
    }

    #[test]
    fn display_name_prefers_full_name() {
        let mut user = User::new("1", "ops@rail.cl", UserRole::Observer);
        assert_eq!(user.display_name(), "ops@rail.cl");
        user.username = Some("ops".into());
        assert_eq!(user.display_name(), "ops");
        user.first_name = Some("Ana".into());
        user.last_name = Some("Rojas".into());
        assert_eq!(user.display_name(), "Ana Rojas");
    }
}
