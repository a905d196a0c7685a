//! View and action gating
//!
//! Read-only consumer of the session. The gate is a UX convenience; the
//! backend enforces the real policy.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Capability, UserRole};

use super::permissions;
use super::service::SessionService;

/// Dashboard screens that require a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Dashboard,
    Crossings,
    Alerts,
    Telemetry,
    Users,
    Logs,
    Settings,
    Profile,
}

impl View {
    pub const ALL: [View; 8] = [
        View::Dashboard,
        View::Crossings,
        View::Alerts,
        View::Telemetry,
        View::Users,
        View::Logs,
        View::Settings,
        View::Profile,
    ];

    /// Capability needed to open the view; `None` means any signed-in user.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            View::Dashboard | View::Crossings => Some(Capability::ViewCruces),
            View::Alerts => Some(Capability::ViewAlertas),
            View::Telemetry => Some(Capability::ViewTelemetria),
            View::Users => Some(Capability::ViewUsuarios),
            View::Logs => Some(Capability::ViewLogs),
            View::Settings => Some(Capability::ViewConfig),
            View::Profile => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin,
    Denied { missing: Capability },
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

#[derive(Clone)]
pub struct RoleGate {
    session: Arc<SessionService>,
}

impl RoleGate {
    pub fn new(session: Arc<SessionService>) -> Self {
        Self { session }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.session.is_authenticated() && self.session.has_permission(capability)
    }

    /// Unknown capability names are denied.
    pub fn allows_named(&self, name: &str) -> bool {
        let user = self.authenticated_user();
        permissions::has_permission_named(user.as_ref(), name)
    }

    pub fn allows_any(&self, capabilities: &[Capability]) -> bool {
        let user = self.authenticated_user();
        permissions::has_any_permission(user.as_ref(), capabilities)
    }

    pub fn allows_all(&self, capabilities: &[Capability]) -> bool {
        let user = self.authenticated_user();
        permissions::has_all_permissions(user.as_ref(), capabilities)
    }

    pub fn allows_role(&self, roles: &[UserRole]) -> bool {
        self.session.is_authenticated() && self.session.has_role(roles)
    }

    pub fn check_view(&self, view: View) -> GateDecision {
        if !self.session.is_authenticated() {
            return GateDecision::RedirectToLogin;
        }
        match view.required_capability() {
            Some(capability) if !self.session.has_permission(capability) => {
                GateDecision::Denied { missing: capability }
            }
            _ => GateDecision::Allow,
        }
    }

    /// Views the current user may open, in menu order.
    pub fn visible_views(&self) -> Vec<View> {
        View::ALL
            .iter()
            .copied()
            .filter(|v| self.check_view(*v).is_allowed())
            .collect()
    }

    fn authenticated_user(&self) -> Option<crate::domain::User> {
        if self.session.is_authenticated() {
            self.session.current_user()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{session_service, PASSWORD};

    #[tokio::test]
    async fn signed_out_users_are_sent_to_login() {
        let (session, _) = session_service(UserRole::Admin);
        let gate = RoleGate::new(session);
        for view in View::ALL {
            assert_eq!(gate.check_view(view), GateDecision::RedirectToLogin);
        }
        assert!(!gate.allows(Capability::ViewCruces));
        assert!(!gate.allows_named("canViewCruces"));
        assert!(!gate.allows_role(&UserRole::ALL));
        assert!(gate.visible_views().is_empty());
    }

    #[tokio::test]
    async fn observer_sees_monitoring_views_only() {
        let (session, _) = session_service(UserRole::Observer);
        session.login("ops@rail.cl", PASSWORD).await.unwrap();
        let gate = RoleGate::new(session.clone());

        assert_eq!(
            gate.visible_views(),
            vec![
                View::Dashboard,
                View::Crossings,
                View::Alerts,
                View::Telemetry,
                View::Profile
            ]
        );
        assert_eq!(
            gate.check_view(View::Users),
            GateDecision::Denied {
                missing: Capability::ViewUsuarios
            }
        );
        assert!(!gate.allows(Capability::ResolveAlertas));
        assert!(gate.allows_any(&[Capability::ResolveAlertas, Capability::ViewAlertas]));
        assert!(!gate.allows_all(&[Capability::ResolveAlertas, Capability::ViewAlertas]));
        session.dispose();
    }

    #[tokio::test]
    async fn admin_passes_every_gate() {
        let (session, _) = session_service(UserRole::Admin);
        session.login("ops@rail.cl", PASSWORD).await.unwrap();
        let gate = RoleGate::new(session.clone());

        assert_eq!(gate.visible_views(), View::ALL.to_vec());
        assert!(gate.allows_named("canManageConfig"));
        assert!(!gate.allows_named("canFly"));
        assert!(gate.allows_role(&[UserRole::Admin]));
        assert!(!gate.allows_role(&[UserRole::Maintenance]));

        session.logout().await;
        assert_eq!(gate.check_view(View::Logs), GateDecision::RedirectToLogin);
    }
}
