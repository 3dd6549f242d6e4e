use serde::Serialize;
use std::collections::BTreeSet;

/// Claim key under which the identity provider lists the user's roles.
pub const ROLES_CLAIM: &str = "https://fullstackauth.com/roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Role {
    #[serde(rename = "alumno")]
    Student,
    #[serde(rename = "profesor")]
    Teacher,
    #[serde(rename = "registroAcademico")]
    Registrar,
}

impl Role {
    pub fn as_claim(self) -> &'static str {
        match self {
            Role::Student => "alumno",
            Role::Teacher => "profesor",
            Role::Registrar => "registroAcademico",
        }
    }

    pub fn from_claim(raw: &str) -> Option<Self> {
        match raw {
            "alumno" => Some(Role::Student),
            "profesor" => Some(Role::Teacher),
            "registroAcademico" => Some(Role::Registrar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Reads the namespaced roles claim. Unknown strings are ignored and a
    /// missing or malformed claim means no roles.
    pub fn from_claims(claims: &serde_json::Value) -> Self {
        let roles = claims
            .get(ROLES_CLAIM)
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .filter_map(Role::from_claim)
                    .collect()
            })
            .unwrap_or_default();
        RoleSet(roles)
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        RoleSet(iter.into_iter().collect())
    }
}

pub fn has_role(roles: &RoleSet, required: Role) -> bool {
    roles.0.contains(&required)
}

pub fn has_any_role(roles: &RoleSet, allowed: &[Role]) -> bool {
    allowed.iter().any(|r| has_role(roles, *r))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub path: &'static str,
    pub label: &'static str,
    pub roles: &'static [Role],
}

pub const NAV_ITEMS: [NavItem; 5] = [
    NavItem {
        path: "/dashboard",
        label: "Dashboard",
        roles: &[Role::Student, Role::Teacher, Role::Registrar],
    },
    NavItem {
        path: "/alumno/boleta",
        label: "Mi Boleta",
        roles: &[Role::Student],
    },
    NavItem {
        path: "/alumno/perfil",
        label: "Mi Perfil",
        roles: &[Role::Student],
    },
    NavItem {
        path: "/profesor/notas",
        label: "Calificaciones",
        roles: &[Role::Teacher],
    },
    NavItem {
        path: "/registro",
        label: "Registro Acad.",
        roles: &[Role::Registrar],
    },
];

pub fn nav_items(roles: &RoleSet) -> Vec<NavItem> {
    NAV_ITEMS
        .iter()
        .filter(|item| has_any_role(roles, item.roles))
        .copied()
        .collect()
}

/// Authorities in the form the backend checks them: the space separated
/// `scope` claim plus the `permissions` array, upper-cased.
pub fn permissions_from_claims(claims: &serde_json::Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    if let Some(scope) = claims.get("scope").and_then(|v| v.as_str()) {
        out.extend(
            scope
                .split(' ')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_uppercase()),
        );
    }
    if let Some(perms) = claims.get("permissions").and_then(|v| v.as_array()) {
        out.extend(
            perms
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_uppercase()),
        );
    }
    out
}

pub fn subject_from_claims(claims: &serde_json::Value) -> Option<String> {
    claims
        .get("sub")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
