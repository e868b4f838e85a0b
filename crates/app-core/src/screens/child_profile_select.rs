use app_state::{ReactiveCollection, ReactiveValue, ReadOnlyValue};
use app_ui::{NavigationOutcome, ViewModel, ViewModelBase};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::screens::{on_pin_success, ChildHomeViewModel, ParentHomeViewModel, PinEntryViewModel};
use crate::services::ChildProfile;

/// "Who is playing?" screen listing the parent's children
pub struct ChildProfileSelectViewModel {
    base: ViewModelBase,
    cx: AppContext,
    children: ReactiveCollection<ChildProfile>,
    selected_child: ReactiveValue<Option<ChildProfile>>,
}

impl ChildProfileSelectViewModel {
    /// Create the screen; children load on first bind
    pub fn new(cx: AppContext) -> Self {
        let base = ViewModelBase::new();
        let scope = base.disposables();
        Self {
            children: scope.track(ReactiveCollection::new()),
            selected_child: scope.track(ReactiveValue::new(None)),
            base,
            cx,
        }
    }

    /// Children of the logged-in parent
    pub fn children(&self) -> &ReactiveCollection<ChildProfile> {
        &self.children
    }

    /// Last selected child
    pub fn selected_child(&self) -> ReadOnlyValue<Option<ChildProfile>> {
        self.selected_child.read_only()
    }

    /// Start a session for `child_id` and open the child home screen
    ///
    /// Unknown ids are ignored and return `Ok(None)`.
    pub async fn select_child(&self, child_id: &str) -> Result<Option<NavigationOutcome>> {
        let Some(child) = self.children.to_vec().into_iter().find(|c| c.id == child_id) else {
            tracing::debug!(child = child_id, "Selected child is not listed");
            return Ok(None);
        };

        self.selected_child.set(Some(child));
        self.cx.profiles.set_current_child(child_id);

        let cx = self.cx.clone();
        let outcome = self
            .cx
            .nav
            .navigate_to(move || ChildHomeViewModel::new(cx))
            .await?;
        Ok(Some(outcome))
    }

    /// Ask for the parent PIN, then open the parent panel
    pub async fn open_parent_panel(&self) -> Result<NavigationOutcome> {
        let cx = self.cx.clone();
        let on_success = on_pin_success(move || {
            let cx = cx.clone();
            async move {
                let next = cx.clone();
                cx.nav
                    .clear_and_navigate_to(move || ParentHomeViewModel::new(next))
                    .await?;
                Ok(())
            }
        });

        let cx = self.cx.clone();
        Ok(self
            .cx
            .nav
            .navigate_to(move || PinEntryViewModel::new(cx, on_success))
            .await?)
    }
}

impl ViewModel for ChildProfileSelectViewModel {
    const KIND: &'static str = "ChildProfileSelectViewModel";

    fn base(&self) -> &ViewModelBase {
        &self.base
    }

    fn initialize(&self) {
        let auth = Arc::clone(&self.cx.auth);
        let profiles = Arc::clone(&self.cx.profiles);
        let children = self.children.clone();
        self.cx.tasks.spawn("load-children", async move {
            let player_id = auth.player_id().ok_or(AppError::NotLoggedIn)?;
            let loaded = profiles.children_for_parent(&player_id).await?;
            tracing::debug!(count = loaded.len(), "Children loaded");
            children.clear();
            children.extend(loaded);
            Ok::<(), AppError>(())
        });
    }
}
