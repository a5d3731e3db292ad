use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Crew,
    Admin,
    Galley,
    Officer,
}

/// Actions gated by role. Operations check exactly one capability up front.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Capability {
    ServeMeals,
    ResolveRequests,
    LogWaste,
    ConfigureWaste,
    ImportMenus,
    ManageCrew,
}

impl Role {
    pub fn grants(self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Crew => false,
            Role::Galley => matches!(capability, ServeMeals | ResolveRequests | LogWaste),
            Role::Officer => matches!(capability, ConfigureWaste | ImportMenus | ManageCrew),
            Role::Admin => matches!(capability, ConfigureWaste | ImportMenus | ManageCrew),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Crew => "crew",
            Role::Admin => "admin",
            Role::Galley => "galley",
            Role::Officer => "officer",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "crew" => Some(Role::Crew),
            "admin" => Some(Role::Admin),
            "galley" => Some(Role::Galley),
            "officer" => Some(Role::Officer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::ServeMeals => "mark meals as served",
            Capability::ResolveRequests => "resolve crew requests",
            Capability::LogWaste => "log food waste",
            Capability::ConfigureWaste => "change waste standards",
            Capability::ImportMenus => "import menus",
            Capability::ManageCrew => "manage the crew list",
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Religion {
    Muslim,
    Hindu,
    Jewish,
    Buddhist,
    #[default]
    None,
    Other,
}

impl Religion {
    pub fn parse(s: &str) -> Option<Religion> {
        match s.to_ascii_lowercase().as_str() {
            "muslim" => Some(Religion::Muslim),
            "hindu" => Some(Religion::Hindu),
            "jewish" => Some(Religion::Jewish),
            "buddhist" => Some(Religion::Buddhist),
            "none" => Some(Religion::None),
            "other" => Some(Religion::Other),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ReligiousRestrictions {
    pub religion: Religion,
    pub avoid_items: Vec<String>,
    pub requires_halal: bool,
    pub requires_kosher: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DietaryProfile {
    pub food_allergies: Vec<String>,
    pub religious_restrictions: ReligiousRestrictions,
    pub medical_restrictions: Vec<String>,
    pub lifestyle_preferences: Vec<String>,
    pub dislikes: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub rank: String,
    pub role: Role,
    pub onboarding_completed: bool,
    pub password_changed: bool,
    pub dietary_profile: DietaryProfile,
}

impl User {
    /// Fresh crew account as created by roster import or manual provisioning.
    pub fn new_crew(user_id: impl Into<String>, name: impl Into<String>, rank: impl Into<String>) -> User {
        User {
            user_id: user_id.into(),
            name: name.into(),
            rank: rank.into(),
            role: Role::Crew,
            onboarding_completed: false,
            password_changed: false,
            dietary_profile: DietaryProfile::default(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn galley_serves_but_does_not_configure() {
        assert!(Role::Galley.grants(Capability::ServeMeals));
        assert!(Role::Galley.grants(Capability::LogWaste));
        assert!(!Role::Galley.grants(Capability::ConfigureWaste));
        assert!(!Role::Galley.grants(Capability::ManageCrew));
    }

    #[test]
    fn crew_has_no_capabilities() {
        for cap in [
            Capability::ServeMeals,
            Capability::ResolveRequests,
            Capability::LogWaste,
            Capability::ConfigureWaste,
            Capability::ImportMenus,
            Capability::ManageCrew,
        ] {
            assert!(!Role::Crew.grants(cap));
        }
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Officer).unwrap(), "\"officer\"");
        assert_eq!(Role::parse("galley"), Some(Role::Galley));
        assert_eq!(Role::parse("captain"), None);
    }
}
