//! Fixtures shared by the screen tests

use app_state::BackgroundTasks;
use app_ui::{MemoryStage, NavigationService, PopupService, ProceduralTransition};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use crate::config::ShellConfig;
use crate::context::AppContext;
use crate::memory::{MemoryAuthService, MemoryChildProfileService, MemoryStatisticsService};
use crate::services::{AuthService, ChildProfile, ChildProfileService, StatisticsService};
use crate::views::{default_catalog, default_manifest};

/// Context over a headless stage with instant transitions
pub(crate) fn context_from(
    auth: Arc<dyn AuthService>,
    profiles: Arc<dyn ChildProfileService>,
) -> AppContext {
    context_with_statistics(auth, profiles, Arc::new(MemoryStatisticsService::new()))
}

pub(crate) fn context_with_statistics(
    auth: Arc<dyn AuthService>,
    profiles: Arc<dyn ChildProfileService>,
    statistics: Arc<dyn StatisticsService>,
) -> AppContext {
    let registries = default_manifest()
        .build(&default_catalog())
        .expect("default registry");
    let stage = Arc::new(MemoryStage::new());
    AppContext {
        nav: NavigationService::new(
            registries.screens,
            stage.clone(),
            Arc::new(ProceduralTransition::instant()),
        ),
        popups: PopupService::new(
            registries.popups,
            stage,
            Arc::new(ProceduralTransition::instant()),
        ),
        auth,
        profiles,
        statistics,
        tasks: BackgroundTasks::new(),
        config: Arc::new(ShellConfig::default()),
    }
}

pub(crate) fn context_with(
    auth: impl AuthService + 'static,
    profiles: impl ChildProfileService + 'static,
) -> AppContext {
    context_from(Arc::new(auth), Arc::new(profiles))
}

pub(crate) fn memory_context(
    auth: MemoryAuthService,
    profiles: MemoryChildProfileService,
) -> AppContext {
    context_with(auth, profiles)
}

pub(crate) fn sample_profile(id: &str, parent_player_id: &str) -> ChildProfile {
    ChildProfile {
        id: id.to_string(),
        parent_player_id: parent_player_id.to_string(),
        name: "Deniz".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2018, 4, 12).expect("valid date"),
        weekday_limit_minutes: 75,
        weekend_limit_minutes: 90,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    }
}
