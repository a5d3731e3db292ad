use std::env;

use crate::{
    data_backend::SharedStore,
    data_types::{Capability, Role, SessionState, User},
    dietary::{first_conflict, DietaryAlert},
    errors::{CrewMealError, Result},
    extraction::Extractor,
};

pub fn logger_init(module_path: &str) {
    let level = if env::var(pretty_env_logger::env_logger::DEFAULT_FILTER_ENV).unwrap_or_default()
        == "debug"
    {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .filter_module(module_path, level)
        .filter_module("crewmeal_rs", level)
        .init();
}

/// Per-session application state, passed explicitly into every operation.
pub struct App {
    pub store: SharedStore,
    pub extractor: Extractor,
    session: SessionState,
    token: Option<String>,
    alert: Option<DietaryAlert>,
}

impl App {
    pub fn new(store: SharedStore, extractor: Extractor) -> App {
        App {
            store,
            extractor,
            session: SessionState::LoggedOut,
            token: None,
            alert: None,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The single dietary alert currently shown, if any.
    pub fn alert(&self) -> Option<&DietaryAlert> {
        self.alert.as_ref()
    }

    pub(crate) fn set_session(&mut self, session: SessionState, token: Option<String>) {
        self.session = session;
        self.token = token;
    }

    pub(crate) fn clear_session(&mut self) {
        self.session = SessionState::LoggedOut;
        self.token = None;
        self.alert = None;
    }

    /// Signed-in user, whatever gate they are currently at.
    pub fn signed_in_user(&self) -> Result<&User> {
        self.session.user().ok_or(CrewMealError::NotSignedIn)
    }

    /// Fully signed-in user. Gated sessions get `InvalidState`.
    pub fn active_user(&self) -> Result<&User> {
        match &self.session {
            SessionState::Active(user) => Ok(user),
            SessionState::LoggedOut | SessionState::Authenticating => {
                Err(CrewMealError::NotSignedIn)
            }
            SessionState::PasswordResetRequired(_) | SessionState::OnboardingRequired(_) => {
                Err(CrewMealError::InvalidState)
            }
        }
    }

    /// Active user holding `capability`.
    pub fn require(&self, capability: Capability) -> Result<&User> {
        let user = self.active_user()?;
        if !user.can(capability) {
            log::warn!(
                "{} ({}) tried to {} without permission",
                user.user_id,
                user.role,
                capability
            );
            return Err(CrewMealError::Forbidden {
                role: user.role.to_string(),
                capability,
            });
        }
        Ok(user)
    }

    /// Replaces the cached profile after a successful write.
    pub(crate) fn replace_user(&mut self, user: User) {
        self.session = match &self.session {
            SessionState::PasswordResetRequired(_) => SessionState::PasswordResetRequired(user),
            SessionState::OnboardingRequired(_) => SessionState::OnboardingRequired(user),
            SessionState::Active(_) => SessionState::Active(user),
            other => other.clone(),
        };
    }

    /// Re-runs the dietary check against the stored menus.
    ///
    /// Only active crew members who finished onboarding get alerts, and only the
    /// first conflicting menu is kept.
    pub async fn refresh_alert(&mut self) -> Result<()> {
        let user = match &self.session {
            SessionState::Active(user)
                if user.role == Role::Crew && user.onboarding_completed =>
            {
                user.clone()
            }
            _ => {
                self.alert = None;
                return Ok(());
            }
        };

        let menus = self.store.menus().await?;
        self.alert = first_conflict(&user, &menus);

        if let Some(alert) = &self.alert {
            log::debug!(
                "Dietary alert for {} on menu {} ({} items)",
                user.user_id,
                alert.menu.menu_id,
                alert.conflicting_items.len()
            );
        }
        Ok(())
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }
}
