//! Parent-panel PIN gate
//!
//! Digits are collected until the configured length is reached, then the PIN
//! is verified in the background. Too many wrong attempts start a lockout
//! whose length grows with each consecutive round.

use app_state::{CancelSource, CancelToken, ReactiveValue, ReadOnlyValue};
use app_ui::{ViewModel, ViewModelBase};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PinEntryConfig;
use crate::context::AppContext;
use crate::error::Result;

/// Delay before a lockout starts, so the wrong-PIN feedback can finish
const SHAKE_DELAY: Duration = Duration::from_millis(450);

/// Future returned by a [`PinSuccess`] continuation
pub type PinSuccessFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Continuation run after a correct PIN
pub type PinSuccess = Arc<dyn Fn() -> PinSuccessFuture + Send + Sync>;

/// Wrap an async closure as a [`PinSuccess`]
pub fn on_pin_success<F, Fut>(f: F) -> PinSuccess
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move || -> PinSuccessFuture { Box::pin(f()) })
}

struct PinState {
    config: PinEntryConfig,
    cx: AppContext,
    on_success: PinSuccess,

    pin: Mutex<String>,
    lockout_round: Mutex<usize>,
    lockout: Mutex<Option<CancelSource>>,
    lifetime: CancelSource,

    digit_count: ReactiveValue<usize>,
    is_loading: ReactiveValue<bool>,
    is_locked: ReactiveValue<bool>,
    lockout_seconds_remaining: ReactiveValue<u64>,
    wrong_attempts: ReactiveValue<u32>,
    status_message: ReactiveValue<String>,
    wrong_pin_signals: ReactiveValue<u32>,
}

/// PIN keypad in front of the parent panel
pub struct PinEntryViewModel {
    base: ViewModelBase,
    state: Arc<PinState>,
}

impl PinEntryViewModel {
    /// Create the screen; `on_success` runs after a correct PIN
    pub fn new(cx: AppContext, on_success: PinSuccess) -> Self {
        let base = ViewModelBase::new();
        let scope = base.disposables();
        let state = Arc::new(PinState {
            config: cx.config.pin_entry.clone(),
            cx,
            on_success,
            pin: Mutex::new(String::new()),
            lockout_round: Mutex::new(0),
            lockout: Mutex::new(None),
            lifetime: CancelSource::new(),
            digit_count: scope.track(ReactiveValue::new(0)),
            is_loading: scope.track(ReactiveValue::new(false)),
            is_locked: scope.track(ReactiveValue::new(false)),
            lockout_seconds_remaining: scope.track(ReactiveValue::new(0)),
            wrong_attempts: scope.track(ReactiveValue::new(0)),
            status_message: scope.track(ReactiveValue::new(String::new())),
            wrong_pin_signals: scope.track(ReactiveValue::new(0)),
        });
        Self { base, state }
    }

    /// Digits in a full PIN
    pub fn pin_length(&self) -> usize {
        self.state.config.pin_length
    }

    /// Wrong attempts allowed before a lockout
    pub fn max_wrong_attempts(&self) -> u32 {
        self.state.config.max_wrong_attempts
    }

    /// Digits typed so far
    pub fn digit_count(&self) -> ReadOnlyValue<usize> {
        self.state.digit_count.read_only()
    }

    /// Verification in flight
    pub fn is_loading(&self) -> ReadOnlyValue<bool> {
        self.state.is_loading.read_only()
    }

    /// Keypad is locked out
    pub fn is_locked(&self) -> ReadOnlyValue<bool> {
        self.state.is_locked.read_only()
    }

    /// Seconds until the lockout ends
    pub fn lockout_seconds_remaining(&self) -> ReadOnlyValue<u64> {
        self.state.lockout_seconds_remaining.read_only()
    }

    /// Wrong attempts in the current round
    pub fn wrong_attempts(&self) -> ReadOnlyValue<u32> {
        self.state.wrong_attempts.read_only()
    }

    /// Remaining-tries or lockout message
    pub fn status_message(&self) -> ReadOnlyValue<String> {
        self.state.status_message.read_only()
    }

    /// Incremented on every wrong PIN; views play their error feedback
    pub fn wrong_pin_signals(&self) -> ReadOnlyValue<u32> {
        self.state.wrong_pin_signals.read_only()
    }

    /// Append a digit; a full PIN is verified in the background
    pub fn press_digit(&self, digit: u8) {
        let state = &self.state;
        if digit > 9 || state.is_locked.get() || state.is_loading.get() {
            return;
        }

        let count = {
            let mut pin = state.pin.lock();
            if pin.len() >= state.config.pin_length {
                return;
            }
            pin.push(char::from(b'0' + digit));
            pin.len()
        };
        state.digit_count.set(count);

        if count == state.config.pin_length {
            state.is_loading.set(true);
            let state = Arc::clone(state);
            self.state
                .cx
                .tasks
                .spawn("pin-verify", async move { state.submit().await });
        }
    }

    /// Remove the last digit
    pub fn press_backspace(&self) {
        let state = &self.state;
        if state.is_locked.get() || state.is_loading.get() {
            return;
        }
        let count = {
            let mut pin = state.pin.lock();
            pin.pop().map(|_| pin.len())
        };
        if let Some(count) = count {
            state.digit_count.set(count);
        }
    }
}

impl PinState {
    async fn submit(self: Arc<Self>) -> Result<()> {
        let pin = self.pin.lock().clone();
        let verified = self.cx.auth.verify_pin(&pin).await;
        if self.lifetime.is_cancelled() {
            return Ok(());
        }

        let correct = match verified {
            Ok(correct) => correct,
            Err(e) => {
                self.clear_pin();
                self.is_loading.set(false);
                self.status_message.set(e.to_string());
                return Err(e.into());
            }
        };

        if correct {
            tracing::info!("Parent PIN accepted");
            self.is_loading.set(false);
            self.wrong_attempts.set(0);
            self.status_message.set(String::new());
            return (self.on_success)().await;
        }

        let wrong = self.wrong_attempts.get() + 1;
        self.wrong_attempts.set(wrong);
        self.clear_pin();
        self.is_loading.set(false);
        self.wrong_pin_signals.update(|n| *n += 1);
        tracing::debug!(wrong, "Wrong parent PIN");

        if wrong >= self.config.max_wrong_attempts {
            let token = self.lifetime.token();
            if token.run_until_cancelled(tokio::time::sleep(SHAKE_DELAY)).await.is_some() {
                self.run_lockout().await;
            }
        } else {
            self.status_message
                .set(remaining_message(self.config.max_wrong_attempts - wrong));
        }
        Ok(())
    }

    async fn run_lockout(&self) {
        let token = self.begin_lockout();
        let round = {
            let mut round = self.lockout_round.lock();
            *round += 1;
            *round - 1
        };
        let duration = self.config.lockout_duration(round).as_secs();
        tracing::info!(round, seconds = duration, "PIN entry locked");

        self.wrong_attempts.set(0);
        self.is_locked.set(true);

        for remaining in (1..=duration).rev() {
            self.lockout_seconds_remaining.set(remaining);
            self.status_message.set(lockout_message(remaining));
            let tick = tokio::time::sleep(Duration::from_secs(1));
            if token.run_until_cancelled(tick).await.is_none() {
                return;
            }
        }

        self.is_locked.set(false);
        self.lockout_seconds_remaining.set(0);
        self.status_message.set(String::new());
    }

    /// Replace any running lockout with a new one
    fn begin_lockout(&self) -> CancelToken {
        let source = CancelSource::new();
        let token = source.token();
        if let Some(previous) = self.lockout.lock().replace(source) {
            previous.cancel();
        }
        token
    }

    fn clear_pin(&self) {
        self.pin.lock().clear();
        self.digit_count.set(0);
    }

    fn shut_down(&self) {
        self.lifetime.cancel();
        if let Some(lockout) = self.lockout.lock().take() {
            lockout.cancel();
        }
    }
}

fn remaining_message(remaining: u32) -> String {
    if remaining == 1 {
        "Last attempt!".to_string()
    } else {
        format!("{} attempts left", remaining)
    }
}

fn lockout_message(remaining_secs: u64) -> String {
    let time = if remaining_secs < 60 {
        format!("{}s", remaining_secs)
    } else {
        format!("{}m {}s", remaining_secs / 60, remaining_secs % 60)
    };
    format!("Too many wrong attempts. Try again in {}.", time)
}

impl ViewModel for PinEntryViewModel {
    const KIND: &'static str = "PinEntryViewModel";

    fn base(&self) -> &ViewModelBase {
        &self.base
    }

    fn on_dispose(&self) {
        self.state.shut_down();
    }
}
