use app_state::{ReactiveValue, ReadOnlyValue};
use app_ui::{NavigationOutcome, ViewModel, ViewModelBase};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::auth_flow::navigate_after_auth;
use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::services::NewChild;

/// Smallest daily limit a parent can pick
pub const MIN_LIMIT_MINUTES: u32 = 15;
/// Largest daily limit a parent can pick
pub const MAX_LIMIT_MINUTES: u32 = 180;

const DEFAULT_WEEKDAY_LIMIT: u32 = 75;
const DEFAULT_WEEKEND_LIMIT: u32 = 90;

/// New child profile form
pub struct CreateChildViewModel {
    base: ViewModelBase,
    cx: AppContext,
    child_name: ReactiveValue<String>,
    birth_date: ReactiveValue<Option<NaiveDate>>,
    birth_date_text: ReactiveValue<String>,
    weekday_limit: ReactiveValue<u32>,
    weekend_limit: ReactiveValue<u32>,
    weekday_limit_text: ReactiveValue<String>,
    weekend_limit_text: ReactiveValue<String>,
    can_submit: ReactiveValue<bool>,
    is_loading: ReactiveValue<bool>,
}

fn limit_text(minutes: u32) -> String {
    format!("{} minutes", minutes)
}

fn clamp_limit(minutes: u32) -> u32 {
    minutes.clamp(MIN_LIMIT_MINUTES, MAX_LIMIT_MINUTES)
}

impl CreateChildViewModel {
    /// Create the screen
    pub fn new(cx: AppContext) -> Self {
        let base = ViewModelBase::new();
        let scope = base.disposables();
        Self {
            child_name: scope.track(ReactiveValue::new(String::new())),
            birth_date: scope.track(ReactiveValue::new(None)),
            birth_date_text: scope.track(ReactiveValue::new(String::new())),
            weekday_limit: scope.track(ReactiveValue::new(DEFAULT_WEEKDAY_LIMIT)),
            weekend_limit: scope.track(ReactiveValue::new(DEFAULT_WEEKEND_LIMIT)),
            weekday_limit_text: scope.track(ReactiveValue::new(limit_text(DEFAULT_WEEKDAY_LIMIT))),
            weekend_limit_text: scope.track(ReactiveValue::new(limit_text(DEFAULT_WEEKEND_LIMIT))),
            can_submit: scope.track(ReactiveValue::new(false)),
            is_loading: scope.track(ReactiveValue::new(false)),
            base,
            cx,
        }
    }

    /// Child name input
    pub fn child_name(&self) -> &ReactiveValue<String> {
        &self.child_name
    }

    /// Birth date input
    pub fn birth_date(&self) -> &ReactiveValue<Option<NaiveDate>> {
        &self.birth_date
    }

    /// Birth date as `dd/mm/yyyy`, empty when unset
    pub fn birth_date_text(&self) -> ReadOnlyValue<String> {
        self.birth_date_text.read_only()
    }

    /// Weekday limit in minutes
    pub fn weekday_limit(&self) -> ReadOnlyValue<u32> {
        self.weekday_limit.read_only()
    }

    /// Weekend limit in minutes
    pub fn weekend_limit(&self) -> ReadOnlyValue<u32> {
        self.weekend_limit.read_only()
    }

    /// Weekday limit label
    pub fn weekday_limit_text(&self) -> ReadOnlyValue<String> {
        self.weekday_limit_text.read_only()
    }

    /// Weekend limit label
    pub fn weekend_limit_text(&self) -> ReadOnlyValue<String> {
        self.weekend_limit_text.read_only()
    }

    /// Name and birth date are filled in
    pub fn can_submit(&self) -> ReadOnlyValue<bool> {
        self.can_submit.read_only()
    }

    /// Profile creation in flight
    pub fn is_loading(&self) -> ReadOnlyValue<bool> {
        self.is_loading.read_only()
    }

    /// Set the weekday limit, clamped to the allowed range
    pub fn set_weekday_limit(&self, minutes: u32) {
        self.weekday_limit.set(clamp_limit(minutes));
    }

    /// Set the weekend limit, clamped to the allowed range
    pub fn set_weekend_limit(&self, minutes: u32) {
        self.weekend_limit.set(clamp_limit(minutes));
    }

    /// Save the profile and leave the form
    ///
    /// Returns to the previous screen; when the form is the only screen
    /// (a parent's first child) routes as after login instead.
    pub async fn submit(&self) -> Result<()> {
        if !self.can_submit.get() || self.is_loading.get() {
            return Ok(());
        }
        let Some(birth_date) = self.birth_date.get() else {
            return Ok(());
        };
        let Some(player_id) = self.cx.auth.player_id() else {
            return Err(AppError::NotLoggedIn);
        };

        self.is_loading.set(true);
        let child = NewChild {
            name: self.child_name.get().trim().to_string(),
            birth_date,
            weekday_limit_minutes: self.weekday_limit.get(),
            weekend_limit_minutes: self.weekend_limit.get(),
        };
        let created = self.cx.profiles.create_child(&player_id, child).await;
        self.is_loading.set(false);

        let profile = created?;
        tracing::info!(child = %profile.id, "Child profile created");

        if self.cx.nav.can_go_back() {
            self.cx.nav.go_back().await;
        } else {
            navigate_after_auth(&self.cx, &player_id).await?;
        }
        Ok(())
    }

    /// Leave without saving
    pub async fn back(&self) -> NavigationOutcome {
        self.cx.nav.go_back().await
    }
}

impl ViewModel for CreateChildViewModel {
    const KIND: &'static str = "CreateChildViewModel";

    fn base(&self) -> &ViewModelBase {
        &self.base
    }

    fn initialize(&self) {
        let scope = self.base.disposables();

        let validate = {
            let name = self.child_name.clone();
            let birth_date = self.birth_date.clone();
            let can_submit = self.can_submit.clone();
            Arc::new(move || {
                can_submit.set(!name.get().trim().is_empty() && birth_date.get().is_some());
            })
        };
        let on_name = Arc::clone(&validate);
        self.child_name.subscribe(move |_| on_name(), false).add_to(scope);
        self.birth_date.subscribe(move |_| validate(), false).add_to(scope);

        let text = self.birth_date_text.clone();
        self.birth_date
            .subscribe(
                move |date| {
                    text.set(
                        date.map(|d| d.format("%d/%m/%Y").to_string())
                            .unwrap_or_default(),
                    );
                },
                true,
            )
            .add_to(scope);

        for (limit, text) in [
            (&self.weekday_limit, &self.weekday_limit_text),
            (&self.weekend_limit, &self.weekend_limit_text),
        ] {
            let text = text.clone();
            limit
                .subscribe(
                    move |minutes| {
                        text.set(limit_text(clamp_limit(*minutes)));
                    },
                    true,
                )
                .add_to(scope);
        }
    }
}
