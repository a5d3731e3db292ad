//! Sign-in flow: credential check, forced password change, onboarding gate.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use regex_lite::Regex;
use static_init::dynamic;

use crate::{
    constants::{role_account_id, MIN_PASSWORD_LEN},
    data_types::{DietaryProfile, Role, SessionState, User},
    errors::{CrewMealError, Result, ValidationError},
    shared_main::App,
};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Trims and checks an identifier (passport number or account id).
pub fn normalize_identifier(raw: &str) -> std::result::Result<String, ValidationError> {
    #[dynamic]
    static RE: Regex = Regex::new("^[A-Za-z0-9_-]{2,32}$").unwrap();

    let trimmed = raw.trim();
    if RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidIdentifier(trimmed.to_string()))
    }
}

pub fn validate_new_password(
    password: &str,
    confirmation: &str,
) -> std::result::Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Gate a freshly authenticated user lands on.
pub fn route(user: User) -> SessionState {
    if !user.password_changed {
        SessionState::PasswordResetRequired(user)
    } else if !user.onboarding_completed {
        SessionState::OnboardingRequired(user)
    } else {
        SessionState::Active(user)
    }
}

async fn authenticate(app: &App, identifier: &str, secret: &str) -> Result<User> {
    let user = app
        .store
        .profile(identifier.trim())
        .await?
        .ok_or(CrewMealError::NotFound)?;

    let hash = app
        .store
        .password_hash(&user.user_id)
        .await?
        .ok_or(CrewMealError::InvalidCredential)?;
    if !verify_password(secret, &hash) {
        return Err(CrewMealError::InvalidCredential);
    }
    Ok(user)
}

async fn open_session(app: &mut App, user: User) -> Result<&SessionState> {
    let token = app.store.create_session(&user.user_id).await?;
    log::info!("{} signed in as {}", user.user_id, user.role);

    app.set_session(route(user), Some(token));
    app.refresh_alert().await?;
    Ok(app.session())
}

/// Drops the stored session behind the app's current token, if any.
async fn end_stored_session(app: &mut App) -> Result<()> {
    if let Some(token) = app.token().map(str::to_string) {
        app.store.delete_session(&token).await?;
    }
    Ok(())
}

pub async fn sign_in<'a>(
    app: &'a mut App,
    identifier: &str,
    secret: &str,
) -> Result<&'a SessionState> {
    end_stored_session(app).await?;
    app.set_session(SessionState::Authenticating, None);

    match authenticate(app, identifier, secret).await {
        Ok(user) => open_session(app, user).await,
        Err(e) => {
            log::warn!("Sign-in failed for '{}': {}", identifier.trim(), e);
            app.clear_session();
            Err(e)
        }
    }
}

/// Quick login for the pre-provisioned officer, galley and admin accounts.
pub async fn sign_in_as_role<'a>(
    app: &'a mut App,
    role: Role,
    secret: &str,
) -> Result<&'a SessionState> {
    let account = role_account_id(role).ok_or(ValidationError::NoQuickLogin)?;
    sign_in(app, account, secret).await
}

pub async fn change_password<'a>(
    app: &'a mut App,
    new_password: &str,
    confirmation: &str,
) -> Result<&'a SessionState> {
    let mut user = match app.session() {
        SessionState::PasswordResetRequired(user) | SessionState::Active(user) => user.clone(),
        SessionState::OnboardingRequired(_) => return Err(CrewMealError::InvalidState),
        SessionState::LoggedOut | SessionState::Authenticating => {
            return Err(CrewMealError::NotSignedIn)
        }
    };
    validate_new_password(new_password, confirmation)?;

    let hash = hash_password(new_password)?;
    app.store.set_password(&user.user_id, &hash).await?;
    user.password_changed = true;
    log::info!("{} changed their password", user.user_id);

    let token = app.token().map(str::to_string);
    app.set_session(route(user), token);
    app.refresh_alert().await?;
    Ok(app.session())
}

pub async fn complete_onboarding(app: &mut App, profile: DietaryProfile) -> Result<&SessionState> {
    let mut user = match app.session() {
        SessionState::OnboardingRequired(user) => user.clone(),
        SessionState::LoggedOut | SessionState::Authenticating => {
            return Err(CrewMealError::NotSignedIn)
        }
        _ => return Err(CrewMealError::InvalidState),
    };

    user.dietary_profile = profile.normalized();
    user.onboarding_completed = true;
    app.store.update_profile(&user).await?;
    log::info!(
        "{} completed onboarding ({:?})",
        user.user_id,
        user.dietary_profile.religious_restrictions.religion
    );

    let token = app.token().map(str::to_string);
    app.set_session(SessionState::Active(user), token);
    app.refresh_alert().await?;
    Ok(app.session())
}

/// Resumes a stored session token. Unknown tokens leave the app logged out.
pub async fn restore_session<'a>(app: &'a mut App, token: &str) -> Result<&'a SessionState> {
    let user = match app.store.session_user(token).await? {
        Some(user_id) => app.store.profile(&user_id).await?,
        None => None,
    };

    match user {
        Some(user) => {
            log::debug!("Restored session for {}", user.user_id);
            app.set_session(route(user), Some(token.to_string()));
            app.refresh_alert().await?;
        }
        None => {
            log::debug!("Session token is no longer valid");
            app.clear_session();
        }
    }
    Ok(app.session())
}

pub async fn logout(app: &mut App) -> Result<()> {
    end_stored_session(app).await?;
    if let Some(user) = app.session().user() {
        log::info!("{} signed out", user.user_id);
    }
    app.clear_session();
    Ok(())
}
