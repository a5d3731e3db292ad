use crate::data_types::Role;

pub const CREWMEAL_DB: &str = "crewmeal.sqlite";
pub const SESSION_FILE: &str = ".crewmeal-session";

/// Password handed out with every freshly provisioned crew account.
pub const DEFAULT_CREW_PASSWORD: &str = "123456";
pub const DEFAULT_ROLE_PASSWORD: &str = "admin";
pub const MIN_PASSWORD_LEN: usize = 6;

/// Primary key of the singleton waste configuration row.
pub const WASTE_CONFIG_ID: &str = "default";
pub const DEFAULT_CONTAINER_VOLUME_M3: f64 = 0.05;
pub const DEFAULT_CONTAINER_WEIGHT_KG: f64 = 25.0;

pub const HIGH_CALORIE_THRESHOLD: u32 = 1000;

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_MODEL: &str = "gemini-3-flash-preview";

/// Pre-onboarded accounts reachable through quick login.
pub const ROLE_ACCOUNTS: [(Role, &str, &str, &str); 3] = [
    (Role::Officer, "u_officer", "Chief Officer Smith", "Chief Officer"),
    (Role::Galley, "u_galley", "Chief Cook Antonio", "Ch. Cook"),
    (Role::Admin, "u_admin", "SysAdmin", "IT Admin"),
];

pub fn role_account_id(role: Role) -> Option<&'static str> {
    ROLE_ACCOUNTS
        .iter()
        .find(|(r, ..)| *r == role)
        .map(|(_, id, ..)| *id)
}
