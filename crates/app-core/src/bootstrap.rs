//! Shell startup and shutdown

use app_state::BackgroundTasks;
use app_ui::{
    NavigationOutcome, NavigationService, PopupService, Stage, TransitionBackend, ViewCatalog,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::auth_flow::navigate_after_auth;
use crate::config::ShellConfig;
use crate::context::AppContext;
use crate::error::Result;
use crate::screens::ParentLoginViewModel;
use crate::memory::MemoryStatisticsService;
use crate::services::{AuthService, ChildProfileService, StatisticsService};
use crate::views::default_catalog;

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over `filter`. Returns `false` when a
/// subscriber was already installed.
pub fn init_logging(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Builder for a [`Shell`]
pub struct ShellBuilder {
    config: ShellConfig,
    catalog: ViewCatalog,
    stage: Arc<dyn Stage>,
    auth: Arc<dyn AuthService>,
    profiles: Arc<dyn ChildProfileService>,
    statistics: Arc<dyn StatisticsService>,
    screen_transition: Option<Arc<dyn TransitionBackend>>,
    popup_transition: Option<Arc<dyn TransitionBackend>>,
}

impl ShellBuilder {
    /// Use `config` instead of the defaults
    pub fn config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve manifest view names against `catalog`
    pub fn catalog(mut self, catalog: ViewCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Read play sessions from `statistics` instead of an empty in-memory store
    pub fn statistics(mut self, statistics: Arc<dyn StatisticsService>) -> Self {
        self.statistics = statistics;
        self
    }

    /// Play screen transitions on `backend` instead of the configured fade
    pub fn screen_transition(mut self, backend: Arc<dyn TransitionBackend>) -> Self {
        self.screen_transition = Some(backend);
        self
    }

    /// Play popup transitions on `backend` instead of the configured scale
    pub fn popup_transition(mut self, backend: Arc<dyn TransitionBackend>) -> Self {
        self.popup_transition = Some(backend);
        self
    }

    /// Build both registries and wire the routers
    ///
    /// Fails when the manifest names an unknown view or repeats an id.
    pub fn build(self) -> Result<Shell> {
        let registries = self.config.registry.build(&self.catalog)?;
        let screen_transition: Arc<dyn TransitionBackend> = match self.screen_transition {
            Some(backend) => backend,
            None => Arc::new(self.config.transitions.screen_transition()),
        };
        let popup_transition: Arc<dyn TransitionBackend> = match self.popup_transition {
            Some(backend) => backend,
            None => Arc::new(self.config.transitions.popup_transition()),
        };

        let nav = NavigationService::new(
            registries.screens,
            Arc::clone(&self.stage),
            screen_transition,
        );
        let popups = PopupService::new(registries.popups, self.stage, popup_transition);
        tracing::info!(
            screens = nav.registry().len(),
            popups = popups.registry().len(),
            "Shell configured"
        );

        Ok(Shell {
            cx: AppContext {
                nav,
                popups,
                auth: self.auth,
                profiles: self.profiles,
                statistics: self.statistics,
                tasks: BackgroundTasks::new(),
                config: Arc::new(self.config),
            },
        })
    }
}

/// The running application shell
#[derive(Debug)]
pub struct Shell {
    cx: AppContext,
}

impl Shell {
    /// Start building a shell over `stage` and the given services
    pub fn builder(
        stage: Arc<dyn Stage>,
        auth: Arc<dyn AuthService>,
        profiles: Arc<dyn ChildProfileService>,
    ) -> ShellBuilder {
        ShellBuilder {
            config: ShellConfig::default(),
            catalog: default_catalog(),
            stage,
            auth,
            profiles,
            statistics: Arc::new(MemoryStatisticsService::new()),
            screen_transition: None,
            popup_transition: None,
        }
    }

    /// Dependencies shared with the screens
    pub fn context(&self) -> &AppContext {
        &self.cx
    }

    /// Show the first screen
    ///
    /// A logged-in parent goes through the post-login routing; everyone else
    /// lands on the login screen.
    pub async fn start(&self) -> Result<NavigationOutcome> {
        match self.cx.auth.player_id() {
            Some(player_id) if self.cx.auth.is_logged_in() => {
                tracing::info!("Resuming parent session");
                navigate_after_auth(&self.cx, &player_id).await
            }
            _ => {
                let cx = self.cx.clone();
                Ok(self
                    .cx
                    .nav
                    .navigate_to(move || ParentLoginViewModel::new(cx))
                    .await?)
            }
        }
    }

    /// Dispose every popup and screen and stop background work
    pub fn shutdown(&self) {
        self.cx.popups.close_all();
        self.cx.nav.reset();
        self.cx.tasks.shutdown();
        tracing::info!("Shell shut down");
    }
}
