//! Views and the binding host
//!
//! A concrete view implements [`Bindable`] for the one view-model kind it
//! renders. The routers wrap it in a [`ViewHost`], which owns the visual
//! instance, the per-binding resource scope and the enter/exit sequencing.

use app_state::{CancelToken, ResourceScope};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

use crate::popup::PopupCloser;
use crate::stage::VisualHandle;
use crate::transition::{TransitionBackend, TransitionDirection};
use crate::view_model::{ViewModel, ViewModelExt};

/// What a view receives while binding
pub struct BindContext<'a> {
    bindings: &'a ResourceScope,
    visual: &'a VisualHandle,
    closer: Option<&'a PopupCloser>,
}

impl<'a> BindContext<'a> {
    /// Scope released when the view is unbound
    ///
    /// Subscriptions wired in `on_bind` belong here.
    pub fn bindings(&self) -> &'a ResourceScope {
        self.bindings
    }

    /// The view's visual instance
    pub fn visual(&self) -> &'a VisualHandle {
        self.visual
    }

    /// Self-close handle, present for popups only
    pub fn closer(&self) -> Option<&'a PopupCloser> {
        self.closer
    }
}

/// Capability of a view that renders view-model kind `VM`
pub trait Bindable<VM: ViewModel>: Send + Sync + 'static {
    /// Wire the view to `vm`
    fn on_bind(&self, vm: &Arc<VM>, cx: &BindContext<'_>);

    /// Called before the binding scope is released
    fn on_unbind(&self) {}
}

struct Binding<VM> {
    view_model: Arc<VM>,
    scope: ResourceScope,
}

/// A view bound to at most one view-model, with its visual instance
pub struct ViewHost<VM: ViewModel> {
    view: Box<dyn Bindable<VM>>,
    visual: VisualHandle,
    transition: Arc<dyn TransitionBackend>,
    closer: Option<PopupCloser>,
    binding: Mutex<Option<Binding<VM>>>,
}

impl<VM: ViewModel> ViewHost<VM> {
    /// Host `view` on `visual`, transitioning through `transition`
    pub fn new(
        view: Box<dyn Bindable<VM>>,
        visual: VisualHandle,
        transition: Arc<dyn TransitionBackend>,
    ) -> Self {
        Self {
            view,
            visual,
            transition,
            closer: None,
            binding: Mutex::new(None),
        }
    }

    pub(crate) fn with_closer(mut self, closer: PopupCloser) -> Self {
        self.closer = Some(closer);
        self
    }

    /// Bind `view_model`, unbinding any previous one first
    pub fn bind(&self, view_model: Arc<VM>) {
        self.unbind();

        view_model.initialize_once();
        let scope = ResourceScope::new();
        let cx = BindContext {
            bindings: &scope,
            visual: &self.visual,
            closer: self.closer.as_ref(),
        };
        self.view.on_bind(&view_model, &cx);

        let previous = self.binding.lock().replace(Binding { view_model, scope });
        if let Some(previous) = previous {
            self.release(previous);
        }
    }

    /// Release the binding and dispose the view-model; no-op when unbound
    pub fn unbind(&self) {
        let binding = self.binding.lock().take();
        if let Some(binding) = binding {
            self.release(binding);
        }
    }

    fn release(&self, binding: Binding<VM>) {
        self.view.on_unbind();
        binding.scope.dispose();
        binding.view_model.dispose();
    }

    /// The bound view-model
    pub fn view_model(&self) -> Option<Arc<VM>> {
        self.binding
            .lock()
            .as_ref()
            .map(|b| Arc::clone(&b.view_model))
    }

    /// The visual instance
    pub fn visual(&self) -> &VisualHandle {
        &self.visual
    }

    /// Play the enter transition
    ///
    /// Returns `false` if `token` fired first; the view then stays
    /// non-interactive and `on_appeared` is not called.
    pub async fn animate_in(&self, token: &CancelToken) -> bool {
        let vm = self.view_model();
        self.visual.set_interactable(false);
        if let Some(vm) = &vm {
            vm.on_appearing();
        }

        let played = token
            .run_until_cancelled(self.transition.play(&self.visual, TransitionDirection::Enter))
            .await;
        if played.is_none() {
            return false;
        }

        self.visual.set_interactable(true);
        if let Some(vm) = &vm {
            vm.on_appeared();
        }
        true
    }

    /// Play the exit transition
    ///
    /// Returns `false` if `token` fired first, in which case
    /// `on_disappeared` is not called.
    pub async fn animate_out(&self, token: &CancelToken) -> bool {
        let vm = self.view_model();
        self.visual.set_interactable(false);
        if let Some(vm) = &vm {
            vm.on_disappearing();
        }

        let played = token
            .run_until_cancelled(self.transition.play(&self.visual, TransitionDirection::Exit))
            .await;
        if played.is_none() {
            return false;
        }

        if let Some(vm) = &vm {
            vm.on_disappeared();
        }
        true
    }
}

// ============================================================================
// Type-erased hosts for the router stacks
// ============================================================================

#[async_trait]
pub(crate) trait ErasedView: Send + Sync {
    fn visual(&self) -> &VisualHandle;

    fn view_model_any(&self) -> Option<Arc<dyn Any + Send + Sync>>;

    async fn animate_in(&self, token: &CancelToken) -> bool;

    async fn animate_out(&self, token: &CancelToken) -> bool;

    /// Unbind (disposing the view-model), then destroy the visual
    fn teardown(&self);
}

#[async_trait]
impl<VM: ViewModel> ErasedView for ViewHost<VM> {
    fn visual(&self) -> &VisualHandle {
        &self.visual
    }

    fn view_model_any(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.view_model()
            .map(|vm| vm as Arc<dyn Any + Send + Sync>)
    }

    async fn animate_in(&self, token: &CancelToken) -> bool {
        ViewHost::animate_in(self, token).await
    }

    async fn animate_out(&self, token: &CancelToken) -> bool {
        ViewHost::animate_out(self, token).await
    }

    fn teardown(&self) {
        self.unbind();
        self.visual.destroy();
    }
}

pub(crate) fn downcast_view_model<VM: ViewModel>(view: &dyn ErasedView) -> Option<Arc<VM>> {
    view.view_model_any()?.downcast::<VM>().ok()
}
