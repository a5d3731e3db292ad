use thiserror::Error;

use crate::data_types::{Capability, RequestStatus};

pub type Result<T, E = CrewMealError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Password must be at least {0} characters.")]
    PasswordTooShort(usize),
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Container count must be greater than zero.")]
    ZeroWasteCount,
    #[error("Container standards must be positive numbers.")]
    InvalidWasteConfig,
    #[error("Rating must be between 1 and 5 stars, got {0}.")]
    StarsOutOfRange(u8),
    #[error("'{0}' is not a valid crew identifier.")]
    InvalidIdentifier(String),
    #[error("Quick login is only available for officer, galley and admin accounts.")]
    NoQuickLogin,
}

#[derive(Debug, Error)]
pub enum CrewMealError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Passport number not found.")]
    NotFound,
    #[error("Invalid password.")]
    InvalidCredential,
    #[error("Account '{0}' already exists.")]
    AlreadyExists(String),
    #[error("Menu '{0}' does not exist.")]
    UnknownMenu(String),
    #[error("Item '{0}' is not on that menu.")]
    UnknownItem(String),
    #[error("Request '{0}' does not exist.")]
    UnknownRequest(String),
    #[error("Request '{0}' was already {1}.")]
    RequestAlreadyResolved(String, RequestStatus),
    #[error("'{0}' does not eat in the crew mess.")]
    NotADiner(String),
    #[error("Not signed in.")]
    NotSignedIn,
    #[error("Action not available in the current session state.")]
    InvalidState,
    #[error("Role '{role}' may not {capability}.")]
    Forbidden { role: String, capability: Capability },
    #[error("Could not extract data from the document. Please try a clearer image.")]
    ExtractionFailed,
    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<argon2::password_hash::Error> for CrewMealError {
    fn from(err: argon2::password_hash::Error) -> Self {
        CrewMealError::PasswordHash(err.to_string())
    }
}
