use app_state::{ReactiveValue, ReadOnlyValue};
use app_ui::{NavigationOutcome, ViewModel, ViewModelBase};
use std::sync::Arc;

use crate::auth_flow::navigate_after_auth;
use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::screens::ParentRegisterViewModel;
use crate::services::AuthError;

/// Parent email/password login
pub struct ParentLoginViewModel {
    base: ViewModelBase,
    cx: AppContext,
    email: ReactiveValue<String>,
    password: ReactiveValue<String>,
    error_message: ReactiveValue<String>,
    is_error_visible: ReactiveValue<bool>,
    can_submit: ReactiveValue<bool>,
    is_loading: ReactiveValue<bool>,
}

impl ParentLoginViewModel {
    /// Create the screen
    pub fn new(cx: AppContext) -> Self {
        let base = ViewModelBase::new();
        let scope = base.disposables();
        Self {
            email: scope.track(ReactiveValue::new(String::new())),
            password: scope.track(ReactiveValue::new(String::new())),
            error_message: scope.track(ReactiveValue::new(String::new())),
            is_error_visible: scope.track(ReactiveValue::new(false)),
            can_submit: scope.track(ReactiveValue::new(false)),
            is_loading: scope.track(ReactiveValue::new(false)),
            base,
            cx,
        }
    }

    /// Email input
    pub fn email(&self) -> &ReactiveValue<String> {
        &self.email
    }

    /// Password input
    pub fn password(&self) -> &ReactiveValue<String> {
        &self.password
    }

    /// Last login error
    pub fn error_message(&self) -> ReadOnlyValue<String> {
        self.error_message.read_only()
    }

    /// Whether the error should be shown
    pub fn is_error_visible(&self) -> ReadOnlyValue<bool> {
        self.is_error_visible.read_only()
    }

    /// Both fields are filled in
    pub fn can_submit(&self) -> ReadOnlyValue<bool> {
        self.can_submit.read_only()
    }

    /// A login request is in flight
    pub fn is_loading(&self) -> ReadOnlyValue<bool> {
        self.is_loading.read_only()
    }

    /// Log in and route to the first post-login screen
    ///
    /// Rejected credentials are shown on the screen and are not an error.
    pub async fn submit(&self) -> Result<()> {
        if !self.can_submit.get() || self.is_loading.get() {
            return Ok(());
        }
        self.is_loading.set(true);
        self.is_error_visible.set(false);

        let result = match self
            .cx
            .auth
            .login(&self.email.get(), &self.password.get())
            .await
        {
            Ok(()) => match self.cx.auth.player_id() {
                Some(player_id) => navigate_after_auth(&self.cx, &player_id)
                    .await
                    .map(|_| ()),
                None => Err(AppError::Auth(AuthError::NoSession)),
            },
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                self.error_message.set(e.to_string());
                self.is_error_visible.set(true);
                Ok(())
            }
        };

        self.is_loading.set(false);
        result
    }

    /// Open the registration screen
    pub async fn open_register(&self) -> Result<NavigationOutcome> {
        let cx = self.cx.clone();
        Ok(self
            .cx
            .nav
            .navigate_to(move || ParentRegisterViewModel::new(cx))
            .await?)
    }

    /// Return to the previous screen
    pub async fn go_back(&self) -> NavigationOutcome {
        self.cx.nav.go_back().await
    }
}

impl ViewModel for ParentLoginViewModel {
    const KIND: &'static str = "ParentLoginViewModel";

    fn base(&self) -> &ViewModelBase {
        &self.base
    }

    fn initialize(&self) {
        let validate = {
            let email = self.email.clone();
            let password = self.password.clone();
            let can_submit = self.can_submit.clone();
            let is_error_visible = self.is_error_visible.clone();
            Arc::new(move || {
                can_submit.set(!email.get().is_empty() && !password.get().is_empty());
                is_error_visible.set(false);
            })
        };

        let on_email = Arc::clone(&validate);
        self.email
            .subscribe(move |_| on_email(), false)
            .add_to(self.base.disposables());
        self.password
            .subscribe(move |_| validate(), false)
            .add_to(self.base.disposables());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryAuthService, MemoryChildProfileService};
    use crate::screens::CreateChildViewModel;
    use crate::test_support::{context_with, memory_context};
    use crate::services::{MockAuthService, MockChildProfileService};
    use app_ui::ViewModelExt;

    async fn login_screen(cx: &AppContext) -> Arc<ParentLoginViewModel> {
        let next = cx.clone();
        cx.nav
            .navigate_to(move || ParentLoginViewModel::new(next))
            .await
            .unwrap();
        cx.nav.current_view_model::<ParentLoginViewModel>().unwrap()
    }

    #[tokio::test]
    async fn test_can_submit_needs_both_fields() {
        let cx = memory_context(MemoryAuthService::new(), MemoryChildProfileService::new());
        let vm = login_screen(&cx).await;

        assert!(!vm.can_submit().get());
        vm.email().set("parent@example.com".into());
        assert!(!vm.can_submit().get());
        vm.password().set("123456".into());
        assert!(vm.can_submit().get());
        vm.email().set(String::new());
        assert!(!vm.can_submit().get());
    }

    #[tokio::test]
    async fn test_wrong_password_shows_error_until_edited() {
        let auth = MemoryAuthService::new().with_account("parent@example.com", "123456");
        let cx = memory_context(auth, MemoryChildProfileService::new());
        let vm = login_screen(&cx).await;

        vm.email().set("parent@example.com".into());
        vm.password().set("654321".into());
        vm.submit().await.unwrap();

        assert!(vm.is_error_visible().get());
        assert_eq!(vm.error_message().get(), "Invalid email or password");
        assert!(!vm.is_loading().get());
        assert_eq!(cx.nav.current_screen_id(), Some(ParentLoginViewModel::screen_id()));

        vm.password().set("123456".into());
        assert!(!vm.is_error_visible().get());
    }

    #[tokio::test]
    async fn test_success_routes_and_disposes_login() {
        let auth = MemoryAuthService::new().with_account("parent@example.com", "123456");
        let cx = memory_context(auth, MemoryChildProfileService::new());
        let vm = login_screen(&cx).await;

        vm.email().set("parent@example.com".into());
        vm.password().set("123456".into());
        vm.submit().await.unwrap();

        assert_eq!(cx.nav.current_screen_id(), Some(CreateChildViewModel::screen_id()));
        assert!(!cx.nav.can_go_back());
        assert!(vm.is_disposed());
    }

    #[tokio::test]
    async fn test_submit_ignored_when_incomplete() {
        let mut auth = MockAuthService::new();
        auth.expect_login().never();
        let cx = context_with(auth, MockChildProfileService::new());
        let vm = login_screen(&cx).await;

        vm.email().set("parent@example.com".into());
        vm.submit().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_register_and_back() {
        let cx = memory_context(MemoryAuthService::new(), MemoryChildProfileService::new());
        let vm = login_screen(&cx).await;

        vm.open_register().await.unwrap();
        assert_eq!(
            cx.nav.current_screen_id(),
            Some(ParentRegisterViewModel::screen_id())
        );

        let register = cx
            .nav
            .current_view_model::<ParentRegisterViewModel>()
            .unwrap();
        register.back_to_login().await.unwrap();
        assert_eq!(cx.nav.current_screen_id(), Some(ParentLoginViewModel::screen_id()));
        assert!(!vm.is_disposed());
    }
}
