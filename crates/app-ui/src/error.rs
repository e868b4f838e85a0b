//! UI core errors

use thiserror::Error;

use crate::identity::ScreenId;

/// Errors surfaced by registries and routers
///
/// Every variant is a configuration error: fatal for the single request that
/// hit it, while the router stays in its last good state.
///
/// A request dropped because a transition was in flight is not an error; the
/// routers report it through their outcome types instead.
#[derive(Debug, Error)]
pub enum UiError {
    /// No registry entry for the requested identifier
    #[error("Screen not registered: {0}")]
    ScreenNotFound(ScreenId),

    /// The registered view does not bind the requested view-model kind
    #[error("View registered for {screen} does not bind {expected} (it binds {actual})")]
    MissingBindingContract {
        /// Identifier that was resolved
        screen: ScreenId,
        /// View-model kind the router needed a view for
        expected: &'static str,
        /// View-model kind the registered view actually binds
        actual: &'static str,
    },

    /// Registry manifest names a view the catalog does not provide
    #[error("Unknown view in registry manifest: {0}")]
    UnknownView(String),

    /// Registry manifest lists the same identifier twice
    #[error("Duplicate registry entry: {0}")]
    DuplicateEntry(ScreenId),

    /// Registry manifest could not be parsed
    #[error("Invalid registry manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Result type for UI core operations
pub type Result<T> = std::result::Result<T, UiError>;
