//! View-models of the shell's screens and popups
//!
//! Each screen owns its reactive state and receives its dependencies through
//! an [`AppContext`](crate::AppContext). Inputs a view writes to are exposed
//! as [`ReactiveValue`](app_state::ReactiveValue)s; derived state is exposed
//! read-only.

mod child_profile_select;
mod confirm;
mod create_child;
mod home;
mod parent_login;
mod parent_register;
mod pin_entry;

pub use child_profile_select::ChildProfileSelectViewModel;
pub use confirm::ConfirmPopupViewModel;
pub use create_child::{CreateChildViewModel, MAX_LIMIT_MINUTES, MIN_LIMIT_MINUTES};
pub use home::{ChildHomeViewModel, ParentHomeViewModel};
pub use parent_login::ParentLoginViewModel;
pub use parent_register::ParentRegisterViewModel;
pub use pin_entry::{on_pin_success, PinEntryViewModel, PinSuccess, PinSuccessFuture};
