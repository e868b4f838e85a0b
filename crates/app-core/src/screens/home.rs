use app_state::{BackgroundTasks, ReactiveCollection, ReactiveValue, ReadOnlyValue};
use app_ui::{NavigationOutcome, PopupOutcome, ViewModel, ViewModelBase};
use chrono::{Local, NaiveDate};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::screens::{ConfirmPopupViewModel, CreateChildViewModel, ParentLoginViewModel};
use crate::services::{ChildProfile, StatisticsService};
use crate::statistics::{
    daily_category_summaries, total_played, CategorySummary, GameStatistic, StatisticsTab,
};

const LOGOUT_PROMPT: &str = "Log out of the parent panel?";

// ============================================================================
// Child home
// ============================================================================

/// Landing screen of a child session
pub struct ChildHomeViewModel {
    base: ViewModelBase,
    cx: AppContext,
    current_child: ReactiveValue<Option<ChildProfile>>,
}

impl ChildHomeViewModel {
    /// Create the screen; the current child loads on first bind
    pub fn new(cx: AppContext) -> Self {
        let base = ViewModelBase::new();
        let current_child = base.disposables().track(ReactiveValue::new(None));
        Self {
            base,
            cx,
            current_child,
        }
    }

    /// Child whose session is running
    pub fn current_child(&self) -> ReadOnlyValue<Option<ChildProfile>> {
        self.current_child.read_only()
    }
}

impl ViewModel for ChildHomeViewModel {
    const KIND: &'static str = "ChildHomeViewModel";

    fn base(&self) -> &ViewModelBase {
        &self.base
    }

    fn initialize(&self) {
        let profiles = Arc::clone(&self.cx.profiles);
        let current_child = self.current_child.clone();
        self.cx.tasks.spawn("load-current-child", async move {
            current_child.set(profiles.current_child().await?);
            Ok::<(), AppError>(())
        });
    }
}

// ============================================================================
// Parent home
// ============================================================================

/// Parent panel
///
/// Shows the parent's children and, for the selected child, play-time
/// statistics: the total for the selected tab and today's play time per
/// category against the child's limit.
pub struct ParentHomeViewModel {
    base: ViewModelBase,
    cx: AppContext,
    selection: Selection,
    selected_tab: ReactiveValue<StatisticsTab>,
    total_played_time: ReactiveValue<u32>,
}

impl ParentHomeViewModel {
    /// Create the screen; children load on first bind
    pub fn new(cx: AppContext) -> Self {
        let base = ViewModelBase::new();
        let scope = base.disposables();
        let selection = Selection {
            children: scope.track(ReactiveCollection::new()),
            selected: scope.track(ReactiveValue::new(None)),
            statistics: scope.track(ReactiveValue::new(Vec::new())),
            summaries: scope.track(ReactiveValue::new(Vec::new())),
            source: Arc::clone(&cx.statistics),
            tasks: cx.tasks.clone(),
        };
        Self {
            selection,
            selected_tab: scope.track(ReactiveValue::new(StatisticsTab::default())),
            total_played_time: scope.track(ReactiveValue::new(0)),
            base,
            cx,
        }
    }

    /// Children of the logged-in parent
    pub fn children(&self) -> &ReactiveCollection<ChildProfile> {
        &self.selection.children
    }

    /// Child whose details are shown
    pub fn selected_child(&self) -> ReadOnlyValue<Option<ChildProfile>> {
        self.selection.selected.read_only()
    }

    /// Play sessions of the selected child
    pub fn statistics(&self) -> ReadOnlyValue<Vec<GameStatistic>> {
        self.selection.statistics.read_only()
    }

    /// Today's play time per category for the selected child
    pub fn daily_category_summaries(&self) -> ReadOnlyValue<Vec<CategorySummary>> {
        self.selection.summaries.read_only()
    }

    /// Window of the total shown
    pub fn selected_tab(&self) -> ReadOnlyValue<StatisticsTab> {
        self.selected_tab.read_only()
    }

    /// Minutes played in the selected tab's window
    pub fn total_played_time(&self) -> ReadOnlyValue<u32> {
        self.total_played_time.read_only()
    }

    /// Switch the statistics window
    pub fn select_tab(&self, tab: StatisticsTab) {
        self.selected_tab.set(tab);
    }

    /// Show the details of `child_id`; unknown ids are ignored
    ///
    /// The child's statistics load in the background.
    pub fn select_child(&self, child_id: &str) {
        self.selection.select(child_id);
    }

    /// Open the new child form
    pub async fn add_child(&self) -> Result<NavigationOutcome> {
        let cx = self.cx.clone();
        Ok(self
            .cx
            .nav
            .navigate_to(move || CreateChildViewModel::new(cx))
            .await?)
    }

    /// Log out immediately and return to the login screen
    pub async fn logout(&self) -> Result<NavigationOutcome> {
        self.cx.auth.logout();
        tracing::info!("Parent logged out");
        let cx = self.cx.clone();
        Ok(self
            .cx
            .nav
            .clear_and_navigate_to(move || ParentLoginViewModel::new(cx))
            .await?)
    }

    /// Ask for confirmation, then log out
    ///
    /// Returns `Ok(None)` when the parent declines or the prompt could not
    /// be shown.
    pub async fn request_logout(&self) -> Result<Option<NavigationOutcome>> {
        let outcome = self
            .cx
            .popups
            .show_popup_for_result(|| ConfirmPopupViewModel::new(LOGOUT_PROMPT))
            .await?;
        match outcome {
            PopupOutcome::Resolved(true) => Ok(Some(self.logout().await?)),
            _ => Ok(None),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Selected child and the statistics loaded for it
#[derive(Clone)]
struct Selection {
    children: ReactiveCollection<ChildProfile>,
    selected: ReactiveValue<Option<ChildProfile>>,
    statistics: ReactiveValue<Vec<GameStatistic>>,
    summaries: ReactiveValue<Vec<CategorySummary>>,
    source: Arc<dyn StatisticsService>,
    tasks: BackgroundTasks,
}

impl Selection {
    fn select(&self, child_id: &str) {
        let Some(child) = self.children.to_vec().into_iter().find(|c| c.id == child_id) else {
            return;
        };
        self.selected.set(Some(child.clone()));

        let this = self.clone();
        self.tasks.spawn("load-statistics", async move {
            let stats = this.source.statistics_for_child(&child.id).await?;
            let still_selected = this
                .selected
                .get()
                .is_some_and(|current| current.id == child.id);
            if !still_selected {
                tracing::debug!(child = %child.id, "Child changed, statistics discarded");
                return Ok(());
            }
            this.summaries
                .set(daily_category_summaries(&stats, &child, today()));
            this.statistics.set(stats);
            Ok::<(), AppError>(())
        });
    }
}

impl ViewModel for ParentHomeViewModel {
    const KIND: &'static str = "ParentHomeViewModel";

    fn base(&self) -> &ViewModelBase {
        &self.base
    }

    fn initialize(&self) {
        let scope = self.base.disposables();
        let recompute = {
            let statistics = self.selection.statistics.clone();
            let tab = self.selected_tab.clone();
            let total = self.total_played_time.clone();
            Arc::new(move || {
                total.set(total_played(&statistics.get(), tab.get(), today()));
            })
        };
        let on_tab = Arc::clone(&recompute);
        self.selected_tab
            .subscribe(move |_| on_tab(), false)
            .add_to(scope);
        self.selection
            .statistics
            .subscribe(move |_| recompute(), false)
            .add_to(scope);

        let auth = Arc::clone(&self.cx.auth);
        let profiles = Arc::clone(&self.cx.profiles);
        let selection = self.selection.clone();
        self.cx.tasks.spawn("load-parent-home", async move {
            let player_id = auth.player_id().ok_or(AppError::NotLoggedIn)?;
            let loaded = profiles.children_for_parent(&player_id).await?;
            let first = loaded.first().map(|c| c.id.clone());
            selection.children.clear();
            selection.children.extend(loaded);
            if let Some(id) = first {
                selection.select(&id);
            }
            Ok::<(), AppError>(())
        });
    }
}
