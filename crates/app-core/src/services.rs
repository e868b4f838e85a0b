//! Service boundaries consumed by the screens
//!
//! Authentication, child-profile storage and play statistics live outside
//! this crate. Screens reach them only through the [`AuthService`],
//! [`ChildProfileService`] and [`StatisticsService`] traits handed to them in
//! the [`AppContext`](crate::AppContext).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::statistics::GameStatistic;

/// Authentication errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Email or password rejected
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An account already exists for the email
    #[error("An account already exists for {0}")]
    AccountExists(String),

    /// Operation needs a logged-in parent
    #[error("No parent is logged in")]
    NoSession,

    /// Backend could not be reached
    #[error("Authentication service unavailable: {0}")]
    Unavailable(String),
}

/// Child profile errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// No profile with the id
    #[error("Child profile not found: {0}")]
    NotFound(String),

    /// Profile data could not be read or written
    #[error("Profile storage failed: {0}")]
    Storage(String),
}

/// A child's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildProfile {
    /// Profile id
    pub id: String,
    /// Player id of the owning parent
    pub parent_player_id: String,
    /// Display name
    pub name: String,
    /// Date of birth
    pub birth_date: NaiveDate,
    /// Daily play limit on weekdays
    pub weekday_limit_minutes: u32,
    /// Daily play limit on weekends
    pub weekend_limit_minutes: u32,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Input for creating a child profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChild {
    /// Display name
    pub name: String,
    /// Date of birth
    pub birth_date: NaiveDate,
    /// Daily play limit on weekdays
    pub weekday_limit_minutes: u32,
    /// Daily play limit on weekends
    pub weekend_limit_minutes: u32,
}

/// Parent authentication
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Whether a parent session exists
    fn is_logged_in(&self) -> bool;

    /// Player id of the logged-in parent
    fn player_id(&self) -> Option<String>;

    /// Log in with email and password
    async fn login(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// Create a parent account and log in
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError>;

    /// Check the parent PIN
    async fn verify_pin(&self, pin: &str) -> Result<bool, AuthError>;

    /// End the parent session
    fn logout(&self);
}

/// Child profile storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChildProfileService: Send + Sync {
    /// Create a profile owned by `parent_player_id`
    async fn create_child(
        &self,
        parent_player_id: &str,
        child: NewChild,
    ) -> Result<ChildProfile, ProfileError>;

    /// Every profile owned by `parent_player_id`
    async fn children_for_parent(
        &self,
        parent_player_id: &str,
    ) -> Result<Vec<ChildProfile>, ProfileError>;

    /// Mark a profile as the one currently playing
    fn set_current_child(&self, child_id: &str);

    /// The profile currently playing
    async fn current_child(&self) -> Result<Option<ChildProfile>, ProfileError>;
}

/// Source of recorded play sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatisticsService: Send + Sync {
    /// Every session recorded for `child_id`, in any order
    async fn statistics_for_child(&self, child_id: &str)
        -> Result<Vec<GameStatistic>, ProfileError>;
}
