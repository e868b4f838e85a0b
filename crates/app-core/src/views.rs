//! Headless views and the default registry
//!
//! Rendering lives outside this crate. The views here bind only what the
//! shell itself needs, so the shell can run against any [`Stage`](app_ui::Stage).

use app_state::Observable;
use app_ui::{
    BindContext, Bindable, ManifestEntry, RegistryManifest, ScreenId, ViewCatalog, ViewModel,
};
use std::sync::Arc;

use crate::screens::{
    ChildHomeViewModel, ChildProfileSelectViewModel, ConfirmPopupViewModel, CreateChildViewModel,
    ParentHomeViewModel, ParentLoginViewModel, ParentRegisterViewModel, PinEntryViewModel,
};

/// View with no bindings
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessView;

impl<VM: ViewModel> Bindable<VM> for HeadlessView {
    fn on_bind(&self, _vm: &Arc<VM>, cx: &BindContext<'_>) {
        tracing::trace!(kind = VM::KIND, visual = %cx.visual().id(), "Headless view bound");
    }
}

/// Confirmation popup view; closes itself once answered
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmPopupView;

impl Bindable<ConfirmPopupViewModel> for ConfirmPopupView {
    fn on_bind(&self, vm: &Arc<ConfirmPopupViewModel>, cx: &BindContext<'_>) {
        let Some(closer) = cx.closer().cloned() else {
            tracing::warn!("Confirm popup bound outside the popup layer");
            return;
        };
        vm.close_requested().bind(cx.bindings(), move |requested| {
            if *requested {
                closer.request_close();
            }
        });
    }
}

/// Catalog name of each screen's view
const SCREEN_VIEWS: &[(&str, &str)] = &[
    (ParentLoginViewModel::KIND, "parent-login-view"),
    (ParentRegisterViewModel::KIND, "parent-register-view"),
    (PinEntryViewModel::KIND, "pin-entry-view"),
    (CreateChildViewModel::KIND, "create-child-view"),
    (ChildProfileSelectViewModel::KIND, "child-profile-select-view"),
    (ChildHomeViewModel::KIND, "child-home-view"),
    (ParentHomeViewModel::KIND, "parent-home-view"),
];

const POPUP_VIEWS: &[(&str, &str)] = &[(ConfirmPopupViewModel::KIND, "confirm-popup-view")];

/// Every view the shell knows by name
pub fn default_catalog() -> ViewCatalog {
    ViewCatalog::new()
        .with_view::<ParentLoginViewModel, _, _>("parent-login-view", || HeadlessView)
        .with_view::<ParentRegisterViewModel, _, _>("parent-register-view", || HeadlessView)
        .with_view::<PinEntryViewModel, _, _>("pin-entry-view", || HeadlessView)
        .with_view::<CreateChildViewModel, _, _>("create-child-view", || HeadlessView)
        .with_view::<ChildProfileSelectViewModel, _, _>("child-profile-select-view", || {
            HeadlessView
        })
        .with_view::<ChildHomeViewModel, _, _>("child-home-view", || HeadlessView)
        .with_view::<ParentHomeViewModel, _, _>("parent-home-view", || HeadlessView)
        .with_view::<ConfirmPopupViewModel, _, _>("confirm-popup-view", || ConfirmPopupView)
}

fn entries(views: &[(&str, &str)]) -> Vec<ManifestEntry> {
    views
        .iter()
        .map(|(kind, view)| ManifestEntry {
            id: ScreenId::from_kind(kind),
            view: view.to_string(),
        })
        .collect()
}

/// Registry manifest pairing every screen with its default view
pub fn default_manifest() -> RegistryManifest {
    RegistryManifest {
        screens: entries(SCREEN_VIEWS),
        popups: entries(POPUP_VIEWS),
    }
}
