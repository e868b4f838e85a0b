use app_state::{ReactiveValue, ReadOnlyValue};
use app_ui::{PopupBase, PopupViewModel, ViewModel, ViewModelBase};

/// Yes/no question shown as a popup
///
/// The answer is delivered through the popup result; the view closes the
/// popup once [`close_requested`](Self::close_requested) turns `true`.
pub struct ConfirmPopupViewModel {
    popup: PopupBase<bool>,
    message: String,
    close_requested: ReactiveValue<bool>,
}

impl ConfirmPopupViewModel {
    /// Create a popup asking `message`
    pub fn new(message: impl Into<String>) -> Self {
        let popup = PopupBase::new();
        let close_requested = popup.base().disposables().track(ReactiveValue::new(false));
        Self {
            popup,
            message: message.into(),
            close_requested,
        }
    }

    /// Question text
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Turns `true` once an answer is given
    pub fn close_requested(&self) -> ReadOnlyValue<bool> {
        self.close_requested.read_only()
    }

    /// Answer yes
    pub fn confirm(&self) {
        self.answer(true);
    }

    /// Answer no
    pub fn decline(&self) {
        self.answer(false);
    }

    fn answer(&self, value: bool) {
        if self.set_result(value) {
            self.close_requested.set(true);
        }
    }
}

impl ViewModel for ConfirmPopupViewModel {
    const KIND: &'static str = "ConfirmPopupViewModel";

    fn base(&self) -> &ViewModelBase {
        self.popup.base()
    }
}

impl PopupViewModel for ConfirmPopupViewModel {
    type Output = bool;

    fn popup(&self) -> &PopupBase<bool> {
        &self.popup
    }
}
