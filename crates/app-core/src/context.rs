//! Dependencies handed to every screen
//!
//! View-models receive an [`AppContext`] at construction instead of looking
//! services up globally. The context owns the routers, so a view-model held
//! by a router also holds the router; [`Shell::shutdown`](crate::Shell::shutdown)
//! disposes every screen and popup, which releases those references.

use app_state::BackgroundTasks;
use app_ui::{NavigationService, PopupService};
use std::fmt;
use std::sync::Arc;

use crate::config::ShellConfig;
use crate::services::{AuthService, ChildProfileService, StatisticsService};

/// Routers, services and configuration shared by the screens
#[derive(Clone)]
pub struct AppContext {
    /// Full-screen router
    pub nav: NavigationService,
    /// Modal overlay router
    pub popups: PopupService,
    /// Parent authentication
    pub auth: Arc<dyn AuthService>,
    /// Child profile storage
    pub profiles: Arc<dyn ChildProfileService>,
    /// Recorded play sessions
    pub statistics: Arc<dyn StatisticsService>,
    /// Fire-and-forget work started by screens
    pub tasks: BackgroundTasks,
    /// Shell configuration
    pub config: Arc<ShellConfig>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("nav", &self.nav)
            .field("popups", &self.popups)
            .field("logged_in", &self.auth.is_logged_in())
            .field("tasks", &self.tasks)
            .finish()
    }
}
