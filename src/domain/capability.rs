//! Role capability table
//!
//! One fixed [`CapabilitySet`] per [`UserRole`]. The table is compile-time
//! data and is never mutated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::user::UserRole;

/// A named permission flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "canViewCruces")]
    ViewCruces,
    #[serde(rename = "canManageCruces")]
    ManageCruces,
    #[serde(rename = "canDeleteCruces")]
    DeleteCruces,
    #[serde(rename = "canViewAlertas")]
    ViewAlertas,
    #[serde(rename = "canManageAlertas")]
    ManageAlertas,
    #[serde(rename = "canResolveAlertas")]
    ResolveAlertas,
    #[serde(rename = "canViewTelemetria")]
    ViewTelemetria,
    #[serde(rename = "canViewUsuarios")]
    ViewUsuarios,
    #[serde(rename = "canManageUsuarios")]
    ManageUsuarios,
    #[serde(rename = "canChangeRoles")]
    ChangeRoles,
    #[serde(rename = "canViewLogs")]
    ViewLogs,
    #[serde(rename = "canViewConfig")]
    ViewConfig,
    #[serde(rename = "canManageConfig")]
    ManageConfig,
    #[serde(rename = "canExportData")]
    ExportData,
}

impl Capability {
    pub const ALL: [Capability; 14] = [
        Capability::ViewCruces,
        Capability::ManageCruces,
        Capability::DeleteCruces,
        Capability::ViewAlertas,
        Capability::ManageAlertas,
        Capability::ResolveAlertas,
        Capability::ViewTelemetria,
        Capability::ViewUsuarios,
        Capability::ManageUsuarios,
        Capability::ChangeRoles,
        Capability::ViewLogs,
        Capability::ViewConfig,
        Capability::ManageConfig,
        Capability::ExportData,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::ViewCruces => "canViewCruces",
            Capability::ManageCruces => "canManageCruces",
            Capability::DeleteCruces => "canDeleteCruces",
            Capability::ViewAlertas => "canViewAlertas",
            Capability::ManageAlertas => "canManageAlertas",
            Capability::ResolveAlertas => "canResolveAlertas",
            Capability::ViewTelemetria => "canViewTelemetria",
            Capability::ViewUsuarios => "canViewUsuarios",
            Capability::ManageUsuarios => "canManageUsuarios",
            Capability::ChangeRoles => "canChangeRoles",
            Capability::ViewLogs => "canViewLogs",
            Capability::ViewConfig => "canViewConfig",
            Capability::ManageConfig => "canManageConfig",
            Capability::ExportData => "canExportData",
        }
    }

    /// View capabilities grant read access; everything else mutates state.
    pub fn is_view(&self) -> bool {
        matches!(
            self,
            Capability::ViewCruces
                | Capability::ViewAlertas
                | Capability::ViewTelemetria
                | Capability::ViewUsuarios
                | Capability::ViewLogs
                | Capability::ViewConfig
        )
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCapability(pub String);

impl fmt::Display for UnknownCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown capability: {}", self.0)
    }
}

impl std::error::Error for UnknownCapability {}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// Capability flags for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySet {
    pub can_view_cruces: bool,
    pub can_manage_cruces: bool,
    pub can_delete_cruces: bool,
    pub can_view_alertas: bool,
    pub can_manage_alertas: bool,
    pub can_resolve_alertas: bool,
    pub can_view_telemetria: bool,
    pub can_view_usuarios: bool,
    pub can_manage_usuarios: bool,
    pub can_change_roles: bool,
    pub can_view_logs: bool,
    pub can_view_config: bool,
    pub can_manage_config: bool,
    pub can_export_data: bool,
}

pub const ADMIN_CAPABILITIES: CapabilitySet = CapabilitySet {
    can_view_cruces: true,
    can_manage_cruces: true,
    can_delete_cruces: true,
    can_view_alertas: true,
    can_manage_alertas: true,
    can_resolve_alertas: true,
    can_view_telemetria: true,
    can_view_usuarios: true,
    can_manage_usuarios: true,
    can_change_roles: true,
    can_view_logs: true,
    can_view_config: true,
    can_manage_config: true,
    can_export_data: true,
};

pub const MAINTENANCE_CAPABILITIES: CapabilitySet = CapabilitySet {
    can_view_cruces: true,
    can_manage_cruces: true,
    can_delete_cruces: false,
    can_view_alertas: true,
    can_manage_alertas: true,
    can_resolve_alertas: true,
    can_view_telemetria: true,
    can_view_usuarios: false,
    can_manage_usuarios: false,
    can_change_roles: false,
    can_view_logs: true,
    can_view_config: true,
    can_manage_config: false,
    can_export_data: true,
};

pub const OBSERVER_CAPABILITIES: CapabilitySet = CapabilitySet {
    can_view_cruces: true,
    can_manage_cruces: false,
    can_delete_cruces: false,
    can_view_alertas: true,
    can_manage_alertas: false,
    can_resolve_alertas: false,
    can_view_telemetria: true,
    can_view_usuarios: false,
    can_manage_usuarios: false,
    can_change_roles: false,
    can_view_logs: false,
    can_view_config: false,
    can_manage_config: false,
    can_export_data: false,
};

impl CapabilitySet {
    pub fn for_role(role: UserRole) -> &'static CapabilitySet {
        match role {
            UserRole::Admin => &ADMIN_CAPABILITIES,
            UserRole::Maintenance => &MAINTENANCE_CAPABILITIES,
            UserRole::Observer => &OBSERVER_CAPABILITIES,
        }
    }

    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewCruces => self.can_view_cruces,
            Capability::ManageCruces => self.can_manage_cruces,
            Capability::DeleteCruces => self.can_delete_cruces,
            Capability::ViewAlertas => self.can_view_alertas,
            Capability::ManageAlertas => self.can_manage_alertas,
            Capability::ResolveAlertas => self.can_resolve_alertas,
            Capability::ViewTelemetria => self.can_view_telemetria,
            Capability::ViewUsuarios => self.can_view_usuarios,
            Capability::ManageUsuarios => self.can_manage_usuarios,
            Capability::ChangeRoles => self.can_change_roles,
            Capability::ViewLogs => self.can_view_logs,
            Capability::ViewConfig => self.can_view_config,
            Capability::ManageConfig => self.can_manage_config,
            Capability::ExportData => self.can_export_data,
        }
    }

    /// Capabilities granted by this row, in table order.
    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .iter()
            .copied()
            .filter(|c| self.get(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for cap in Capability::ALL {
            assert_eq!(cap.name().parse::<Capability>(), Ok(cap));
        }
        assert!("canLaunchRockets".parse::<Capability>().is_err());
    }

    #[test]
    fn admin_has_everything() {
        assert_eq!(ADMIN_CAPABILITIES.granted().len(), Capability::ALL.len());
    }

    #[test]
    fn maintenance_manages_but_cannot_delete_crossings() {
        let caps = CapabilitySet::for_role(UserRole::Maintenance);
        assert!(caps.can_manage_cruces);
        assert!(!caps.can_delete_cruces);
        assert!(caps.can_resolve_alertas);
        assert!(!caps.can_manage_usuarios);
        assert!(!caps.can_change_roles);
        assert!(!caps.can_manage_config);
    }

    #[test]
    fn observer_never_mutates() {
        let caps = CapabilitySet::for_role(UserRole::Observer);
        for cap in Capability::ALL.iter().filter(|c| !c.is_view()) {
            assert!(!caps.get(*cap), "observer should not have {}", cap);
        }
    }

    #[test]
    fn observer_sees_the_read_only_monitoring_views() {
        let caps = CapabilitySet::for_role(UserRole::Observer);
        for cap in [
            Capability::ViewCruces,
            Capability::ViewAlertas,
            Capability::ViewTelemetria,
        ] {
            assert!(caps.get(cap));
            assert_eq!(caps.get(cap), ADMIN_CAPABILITIES.get(cap));
        }
    }

    #[test]
    fn serializes_with_dashboard_field_names() {
        let json = serde_json::to_value(MAINTENANCE_CAPABILITIES).unwrap();
        assert_eq!(json["canManageCruces"], true);
        assert_eq!(json["canDeleteCruces"], false);
    }
}
