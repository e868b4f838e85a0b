use app_state::{ReactiveValue, ReadOnlyValue};
use app_ui::{NavigationOutcome, ViewModel, ViewModelBase};
use std::sync::Arc;

use crate::auth_flow::navigate_after_auth;
use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::screens::ParentLoginViewModel;
use crate::services::AuthError;

const PIN_FORMAT_ERROR: &str = "PIN must be all digits";
const PIN_MISMATCH_ERROR: &str = "PINs do not match";

/// Parent account creation
///
/// The password doubles as the parent-panel PIN, so it must be exactly
/// `pin_length` digits and typed twice.
pub struct ParentRegisterViewModel {
    base: ViewModelBase,
    cx: AppContext,
    name: ReactiveValue<String>,
    email: ReactiveValue<String>,
    password: ReactiveValue<String>,
    confirm_password: ReactiveValue<String>,
    error_message: ReactiveValue<String>,
    is_error_visible: ReactiveValue<bool>,
    can_submit: ReactiveValue<bool>,
    is_loading: ReactiveValue<bool>,
}

struct Form {
    pin_length: usize,
    name: ReactiveValue<String>,
    email: ReactiveValue<String>,
    password: ReactiveValue<String>,
    confirm_password: ReactiveValue<String>,
    error_message: ReactiveValue<String>,
    is_error_visible: ReactiveValue<bool>,
    can_submit: ReactiveValue<bool>,
}

impl Form {
    fn validate(&self) {
        let password = self.password.get();
        let has_pin = !password.is_empty();
        let pin_valid = password.len() == self.pin_length
            && password.chars().all(|c| c.is_ascii_digit());
        let pins_match = has_pin && self.confirm_password.get() == password;

        self.can_submit.set(
            !self.name.get().is_empty() && !self.email.get().is_empty() && pin_valid && pins_match,
        );

        if has_pin && !pin_valid {
            self.show_error(format!("{} ({} digits)", PIN_FORMAT_ERROR, self.pin_length));
        } else if has_pin && !pins_match {
            self.show_error(PIN_MISMATCH_ERROR.to_string());
        } else {
            self.is_error_visible.set(false);
        }
    }

    fn show_error(&self, message: String) {
        self.error_message.set(message);
        self.is_error_visible.set(true);
    }
}

impl ParentRegisterViewModel {
    /// Create the screen
    pub fn new(cx: AppContext) -> Self {
        let base = ViewModelBase::new();
        let scope = base.disposables();
        Self {
            name: scope.track(ReactiveValue::new(String::new())),
            email: scope.track(ReactiveValue::new(String::new())),
            password: scope.track(ReactiveValue::new(String::new())),
            confirm_password: scope.track(ReactiveValue::new(String::new())),
            error_message: scope.track(ReactiveValue::new(String::new())),
            is_error_visible: scope.track(ReactiveValue::new(false)),
            can_submit: scope.track(ReactiveValue::new(false)),
            is_loading: scope.track(ReactiveValue::new(false)),
            base,
            cx,
        }
    }

    /// Parent name input
    pub fn name(&self) -> &ReactiveValue<String> {
        &self.name
    }

    /// Email input
    pub fn email(&self) -> &ReactiveValue<String> {
        &self.email
    }

    /// Password / PIN input
    pub fn password(&self) -> &ReactiveValue<String> {
        &self.password
    }

    /// Repeated password input
    pub fn confirm_password(&self) -> &ReactiveValue<String> {
        &self.confirm_password
    }

    /// Validation or registration error
    pub fn error_message(&self) -> ReadOnlyValue<String> {
        self.error_message.read_only()
    }

    /// Whether the error should be shown
    pub fn is_error_visible(&self) -> ReadOnlyValue<bool> {
        self.is_error_visible.read_only()
    }

    /// Every field is valid
    pub fn can_submit(&self) -> ReadOnlyValue<bool> {
        self.can_submit.read_only()
    }

    /// A registration request is in flight
    pub fn is_loading(&self) -> ReadOnlyValue<bool> {
        self.is_loading.read_only()
    }

    /// Create the account and route to the first post-login screen
    pub async fn submit(&self) -> Result<()> {
        if !self.can_submit.get() || self.is_loading.get() {
            tracing::debug!(
                can_submit = self.can_submit.get(),
                is_loading = self.is_loading.get(),
                "Registration blocked"
            );
            return Ok(());
        }
        self.is_loading.set(true);
        self.is_error_visible.set(false);

        let registered = self
            .cx
            .auth
            .register(&self.name.get(), &self.email.get(), &self.password.get())
            .await;
        let result = match registered {
            Ok(()) => match self.cx.auth.player_id() {
                Some(player_id) => navigate_after_auth(&self.cx, &player_id)
                    .await
                    .map(|_| ()),
                None => Err(AppError::Auth(AuthError::NoSession)),
            },
            Err(e) => {
                tracing::warn!("Registration failed: {}", e);
                self.error_message.set(e.to_string());
                self.is_error_visible.set(true);
                Ok(())
            }
        };

        self.is_loading.set(false);
        result
    }

    /// Return to the login screen
    ///
    /// Pops back when login is underneath, otherwise opens a fresh one.
    pub async fn back_to_login(&self) -> Result<NavigationOutcome> {
        if self.cx.nav.can_go_back() {
            return Ok(self.cx.nav.go_back().await);
        }
        let cx = self.cx.clone();
        Ok(self
            .cx
            .nav
            .navigate_to(move || ParentLoginViewModel::new(cx))
            .await?)
    }
}

impl ViewModel for ParentRegisterViewModel {
    const KIND: &'static str = "ParentRegisterViewModel";

    fn base(&self) -> &ViewModelBase {
        &self.base
    }

    fn initialize(&self) {
        let form = Arc::new(Form {
            pin_length: self.cx.config.pin_entry.pin_length,
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
            error_message: self.error_message.clone(),
            is_error_visible: self.is_error_visible.clone(),
            can_submit: self.can_submit.clone(),
        });

        for input in [&self.name, &self.email, &self.password, &self.confirm_password] {
            let form = Arc::clone(&form);
            input
                .subscribe(move |_| form.validate(), false)
                .add_to(self.base.disposables());
        }
    }
}
