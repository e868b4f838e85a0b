//! In-memory service implementations
//!
//! Used by the shell when no backend is wired in, and by integration tests.
//! A parent's password doubles as the parent-panel PIN.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use crate::services::{
    AuthError, AuthService, ChildProfile, ChildProfileService, NewChild, ProfileError,
    StatisticsService,
};
use crate::statistics::GameStatistic;

#[derive(Debug, Clone)]
struct Account {
    player_id: String,
    password: String,
}

/// Accounts kept in a map; one session at a time
#[derive(Debug, Default)]
pub struct MemoryAuthService {
    accounts: Mutex<HashMap<String, Account>>,
    session: Mutex<Option<Account>>,
}

impl MemoryAuthService {
    /// Create a service with no accounts
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account without logging in
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.insert(email, password);
        self
    }

    fn insert(&self, email: &str, password: &str) -> Account {
        let account = Account {
            player_id: Uuid::new_v4().to_string(),
            password: password.to_string(),
        };
        self.accounts
            .lock()
            .insert(email.to_lowercase(), account.clone());
        account
    }
}

#[async_trait]
impl AuthService for MemoryAuthService {
    fn is_logged_in(&self) -> bool {
        self.session.lock().is_some()
    }

    fn player_id(&self) -> Option<String> {
        self.session.lock().as_ref().map(|a| a.player_id.clone())
    }

    async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let account = self.accounts.lock().get(&email.to_lowercase()).cloned();
        match account {
            Some(account) if account.password == password => {
                tracing::info!(player_id = %account.player_id, "Parent logged in");
                *self.session.lock() = Some(account);
                Ok(())
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        if self.accounts.lock().contains_key(&email.to_lowercase()) {
            return Err(AuthError::AccountExists(email.to_string()));
        }
        let account = self.insert(email, password);
        tracing::info!(player_id = %account.player_id, name, "Parent registered");
        *self.session.lock() = Some(account);
        Ok(())
    }

    async fn verify_pin(&self, pin: &str) -> Result<bool, AuthError> {
        let session = self.session.lock().clone();
        match session {
            Some(account) => Ok(account.password == pin),
            None => Err(AuthError::NoSession),
        }
    }

    fn logout(&self) {
        self.session.lock().take();
    }
}

/// Profiles kept in a vector
#[derive(Debug, Default)]
pub struct MemoryChildProfileService {
    profiles: Mutex<Vec<ChildProfile>>,
    current: Mutex<Option<String>>,
}

impl MemoryChildProfileService {
    /// Create a service with no profiles
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles
    pub fn len(&self) -> usize {
        self.profiles.lock().len()
    }

    /// Whether no profiles are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ChildProfileService for MemoryChildProfileService {
    async fn create_child(
        &self,
        parent_player_id: &str,
        child: NewChild,
    ) -> Result<ChildProfile, ProfileError> {
        let profile = ChildProfile {
            id: Uuid::new_v4().to_string(),
            parent_player_id: parent_player_id.to_string(),
            name: child.name,
            birth_date: child.birth_date,
            weekday_limit_minutes: child.weekday_limit_minutes,
            weekend_limit_minutes: child.weekend_limit_minutes,
            created_at: Utc::now(),
        };
        self.profiles.lock().push(profile.clone());
        Ok(profile)
    }

    async fn children_for_parent(
        &self,
        parent_player_id: &str,
    ) -> Result<Vec<ChildProfile>, ProfileError> {
        Ok(self
            .profiles
            .lock()
            .iter()
            .filter(|p| p.parent_player_id == parent_player_id)
            .cloned()
            .collect())
    }

    fn set_current_child(&self, child_id: &str) {
        *self.current.lock() = Some(child_id.to_string());
    }

    async fn current_child(&self) -> Result<Option<ChildProfile>, ProfileError> {
        let Some(id) = self.current.lock().clone() else {
            return Ok(None);
        };
        self.profiles
            .lock()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .map(Some)
            .ok_or(ProfileError::NotFound(id))
    }
}

/// Play sessions kept per child
#[derive(Debug, Default)]
pub struct MemoryStatisticsService {
    sessions: Mutex<HashMap<String, Vec<GameStatistic>>>,
}

impl MemoryStatisticsService {
    /// Create a service with no sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one session for `child_id`
    pub fn record(&self, child_id: &str, session: GameStatistic) {
        self.sessions
            .lock()
            .entry(child_id.to_string())
            .or_default()
            .push(session);
    }
}

#[async_trait]
impl StatisticsService for MemoryStatisticsService {
    async fn statistics_for_child(
        &self,
        child_id: &str,
    ) -> Result<Vec<GameStatistic>, ProfileError> {
        Ok(self
            .sessions
            .lock()
            .get(child_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_login_and_pin() {
        let auth = MemoryAuthService::new().with_account("Parent@Example.com", "123456");
        assert!(!auth.is_logged_in());
        assert_eq!(auth.verify_pin("123456").await, Err(AuthError::NoSession));

        assert_eq!(
            auth.login("parent@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );
        auth.login("parent@example.com", "123456").await.unwrap();

        assert!(auth.is_logged_in());
        assert!(auth.player_id().is_some());
        assert_eq!(auth.verify_pin("123456").await, Ok(true));
        assert_eq!(auth.verify_pin("000000").await, Ok(false));

        auth.logout();
        assert!(!auth.is_logged_in());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let auth = MemoryAuthService::new();
        auth.register("Ada", "ada@example.com", "111111").await.unwrap();
        assert!(auth.is_logged_in());
        assert!(matches!(
            auth.register("Ada", "ADA@example.com", "222222").await,
            Err(AuthError::AccountExists(_))
        ));
    }

    #[tokio::test]
    async fn test_profiles_by_parent_and_current() {
        let profiles = MemoryChildProfileService::new();
        let child = NewChild {
            name: "Deniz".into(),
            birth_date: NaiveDate::from_ymd_opt(2018, 5, 1).unwrap(),
            weekday_limit_minutes: 60,
            weekend_limit_minutes: 90,
        };
        let created = profiles.create_child("p1", child.clone()).await.unwrap();
        profiles.create_child("p2", child).await.unwrap();

        let mine = profiles.children_for_parent("p1").await.unwrap();
        assert_eq!(mine, vec![created.clone()]);
        assert_eq!(profiles.current_child().await.unwrap(), None);

        profiles.set_current_child(&created.id);
        assert_eq!(profiles.current_child().await.unwrap(), Some(created));

        profiles.set_current_child("missing");
        assert!(matches!(
            profiles.current_child().await,
            Err(ProfileError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_statistics_kept_per_child() {
        let stats = MemoryStatisticsService::new();
        let session = GameStatistic {
            game: "puzzle".into(),
            category: Some("logic".into()),
            play_time_minutes: 12,
            stars: 3,
            date: NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
        };
        stats.record("c1", session.clone());

        assert_eq!(stats.statistics_for_child("c1").await.unwrap(), vec![session]);
        assert!(stats.statistics_for_child("c2").await.unwrap().is_empty());
    }
}
