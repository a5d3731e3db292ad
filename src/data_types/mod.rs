pub mod galley;
pub mod menu;
pub mod profile;

pub use galley::{
    MealAttendance, MealStatus, MonthlyWaste, Notification, NotificationType, Request,
    RequestStatus, RequestType, WasteConfig, WasteLog,
};
pub use menu::{Category, DietaryFlags, MealType, Menu, MenuItem, Mood, Rating};
pub use profile::{Capability, DietaryProfile, Religion, ReligiousRestrictions, Role, User};

/// Where a signed-in user currently is in the login flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    LoggedOut,
    Authenticating,
    PasswordResetRequired(User),
    OnboardingRequired(User),
    Active(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::PasswordResetRequired(user)
            | SessionState::OnboardingRequired(user)
            | SessionState::Active(user) => Some(user),
            SessionState::LoggedOut | SessionState::Authenticating => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }
}
