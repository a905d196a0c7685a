//! Role → capability resolution
//!
//! Pure functions over an optional user. An absent user is denied every
//! capability and every role; nothing here fails.

use crate::domain::{Capability, CapabilitySet, User, UserRole};

/// The user's role, or `Observer` when there is no user.
pub fn get_role(user: Option<&User>) -> UserRole {
    user.map(|u| u.role).unwrap_or_default()
}

pub fn get_capabilities(user: Option<&User>) -> &'static CapabilitySet {
    CapabilitySet::for_role(get_role(user))
}

pub fn has_permission(user: Option<&User>, capability: Capability) -> bool {
    match user {
        Some(u) => CapabilitySet::for_role(u.role).get(capability),
        None => false,
    }
}

/// Lookup by wire name (`"canManageCruces"`). Unknown names are denied.
pub fn has_permission_named(user: Option<&User>, name: &str) -> bool {
    match name.parse::<Capability>() {
        Ok(capability) => has_permission(user, capability),
        Err(_) => false,
    }
}

pub fn has_role(user: Option<&User>, roles: &[UserRole]) -> bool {
    user.is_some_and(|u| roles.contains(&u.role))
}

pub fn has_any_permission(user: Option<&User>, capabilities: &[Capability]) -> bool {
    capabilities.iter().any(|c| has_permission(user, *c))
}

/// True only for a present user holding every listed capability. An empty
/// list is vacuously granted to a present user.
pub fn has_all_permissions(user: Option<&User>, capabilities: &[Capability]) -> bool {
    user.is_some() && capabilities.iter().all(|c| has_permission(user, *c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User::new("7", "op@rail.cl", role)
    }

    #[test]
    fn absent_user_is_observer_but_denied_everything() {
        assert_eq!(get_role(None), UserRole::Observer);
        for cap in Capability::ALL {
            assert!(!has_permission(None, cap));
        }
        assert!(!has_role(None, &UserRole::ALL));
        assert!(!has_all_permissions(None, &[]));
    }

    #[test]
    fn unknown_role_resolves_to_observer_capabilities() {
        let parsed: User = serde_json::from_value(serde_json::json!({
            "id": 1, "email": "x@rail.cl", "role": "SUPERVISOR"
        }))
        .unwrap();
        assert_eq!(get_role(Some(&parsed)), UserRole::Observer);
        assert!(has_permission(Some(&parsed), Capability::ViewCruces));
        assert!(!has_permission(Some(&parsed), Capability::ManageCruces));
    }

    #[test]
    fn maintenance_row() {
        let m = user(UserRole::Maintenance);
        assert!(has_permission(Some(&m), Capability::ManageCruces));
        assert!(!has_permission(Some(&m), Capability::DeleteCruces));
        assert_eq!(get_capabilities(Some(&m)), &crate::domain::capability::MAINTENANCE_CAPABILITIES);
    }

    #[test]
    fn named_lookup_fails_closed() {
        let admin = user(UserRole::Admin);
        assert!(has_permission_named(Some(&admin), "canChangeRoles"));
        assert!(!has_permission_named(Some(&admin), "canChangeEverything"));
        assert!(!has_permission_named(None, "canViewCruces"));
    }

    #[test]
    fn role_membership() {
        let obs = user(UserRole::Observer);
        assert!(has_role(Some(&obs), &[UserRole::Observer, UserRole::Admin]));
        assert!(!has_role(Some(&obs), &[UserRole::Admin]));
    }

    #[test]
    fn any_and_all() {
        let obs = user(UserRole::Observer);
        let caps = [Capability::ViewAlertas, Capability::ResolveAlertas];
        assert!(has_any_permission(Some(&obs), &caps));
        assert!(!has_all_permissions(Some(&obs), &caps));
        assert!(has_all_permissions(Some(&user(UserRole::Admin)), &caps));
    }
}
