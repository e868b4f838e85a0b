//! Navigation and view-lifecycle core for the Miyo shell
//!
//! This crate ties view-models to their visual representation and routes
//! between them. It provides two independent routers:
//!
//! - [`NavigationService`] - a stack of full screens, one active at a time
//! - [`PopupService`] - a stack of modal overlays that can return results
//!
//! Both resolve screens through a [`ScreenRegistry`], bind a view to a fresh
//! view-model through a [`ViewHost`], and play enter/exit transitions through
//! a [`TransitionBackend`]. Only one transition runs per router; requests
//! arriving meanwhile are dropped.
//!
//! # Modules
//!
//! - [`identity`] - Screen identifiers derived from view-model kinds
//! - [`view_model`] - View-model contract, lifecycle and popup results
//! - [`completion`] - Single-assignment result sources
//! - [`view`] - Binding contract and view host
//! - [`stage`] - Visual stage boundary and the in-memory stage
//! - [`transition`] - Procedural and externally driven transitions
//! - [`registry`] - Screen registry and manifest loading
//! - [`navigation`] - Full-screen router
//! - [`popup`] - Modal overlay router
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use app_ui::{
//!     BindContext, Bindable, MemoryStage, NavigationOutcome, NavigationService,
//!     ProceduralTransition, ScreenRegistry, ViewModel, ViewModelBase,
//! };
//!
//! #[derive(Default)]
//! struct HomeViewModel {
//!     base: ViewModelBase,
//! }
//!
//! impl ViewModel for HomeViewModel {
//!     const KIND: &'static str = "HomeViewModel";
//!
//!     fn base(&self) -> &ViewModelBase {
//!         &self.base
//!     }
//! }
//!
//! struct HomeView;
//!
//! impl Bindable<HomeViewModel> for HomeView {
//!     fn on_bind(&self, _vm: &Arc<HomeViewModel>, _cx: &BindContext<'_>) {}
//! }
//!
//! # tokio_test_block_on(async {
//! let registry = ScreenRegistry::builder()
//!     .register::<HomeViewModel, _, _>(|| HomeView)
//!     .build()
//!     .unwrap();
//! let nav = NavigationService::new(
//!     registry,
//!     Arc::new(MemoryStage::new()),
//!     Arc::new(ProceduralTransition::instant()),
//! );
//!
//! let outcome = nav.navigate_to(HomeViewModel::default).await.unwrap();
//! assert_eq!(outcome, NavigationOutcome::Completed);
//! assert_eq!(nav.current_screen_id().unwrap().as_str(), "home");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod completion;
pub mod error;
pub mod identity;
pub mod navigation;
pub mod popup;
pub mod registry;
pub mod stage;
pub mod transition;
pub mod view;
pub mod view_model;

#[cfg(test)]
mod test_support;

pub use completion::{Completion, CompletionSource, ResultFuture};
pub use error::{Result, UiError};
pub use identity::ScreenId;
pub use navigation::{NavigationOutcome, NavigationService};
pub use popup::{PopupCloser, PopupKey, PopupOutcome, PopupService};
pub use registry::{
    ManifestEntry, Registries, RegistryManifest, ScreenRegistry, ScreenRegistryBuilder,
    ViewCatalog, ViewFactory,
};
pub use stage::{Layer, MemoryStage, Stage, VisualHandle, VisualId, VisualState};
pub use transition::{
    DrivenTransition, Ease, ManualTransitionDriver, ProceduralTransition, TransitionBackend,
    TransitionConfig, TransitionDirection, TransitionDriver,
};
pub use view::{BindContext, Bindable, ViewHost};
pub use view_model::{
    LifecycleState, PopupBase, PopupViewModel, ViewModel, ViewModelBase, ViewModelExt,
};
