//! Application errors

use app_ui::UiError;
use thiserror::Error;

use crate::services::{AuthError, ProfileError};

/// Errors surfaced by screens and the shell
#[derive(Debug, Error)]
pub enum AppError {
    /// Navigation or popup configuration error
    #[error(transparent)]
    Ui(#[from] UiError),

    /// Authentication failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Child profile storage failed
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Shell configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// An action needs a logged-in parent
    #[error("No parent is logged in")]
    NotLoggedIn,
}

/// Result type for application operations
pub type Result<T> = std::result::Result<T, AppError>;
