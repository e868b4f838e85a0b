//! View-model contract and lifecycle
//!
//! A view-model holds observable UI state and behaviour and knows nothing
//! about rendering. Concrete view-models embed a [`ViewModelBase`], which owns
//! their [`ResourceScope`] and tracks the lifecycle:
//!
//! ```text
//! Uninitialized ──initialize_once──▶ Initialized ──dispose──▶ Disposed
//!        └────────────────────────dispose─────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use app_state::ReactiveValue;
//! use app_ui::{ViewModel, ViewModelBase, ViewModelExt};
//!
//! #[derive(Default)]
//! struct CounterViewModel {
//!     base: ViewModelBase,
//!     count: ReactiveValue<u32>,
//! }
//!
//! impl ViewModel for CounterViewModel {
//!     const KIND: &'static str = "CounterViewModel";
//!
//!     fn base(&self) -> &ViewModelBase {
//!         &self.base
//!     }
//! }
//!
//! let vm = CounterViewModel::default();
//! assert_eq!(CounterViewModel::screen_id().as_str(), "counter");
//! vm.initialize_once();
//! vm.dispose();
//! assert!(vm.is_disposed());
//! ```

use app_state::ResourceScope;
use parking_lot::Mutex;

use crate::completion::{CompletionSource, ResultFuture};
use crate::identity::ScreenId;

/// Lifecycle state of a view-model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Created, not yet bound
    Uninitialized,
    /// `initialize` has run
    Initialized,
    /// Terminal; resources released
    Disposed,
}

/// State every view-model embeds
#[derive(Debug)]
pub struct ViewModelBase {
    disposables: ResourceScope,
    state: Mutex<LifecycleState>,
}

impl Default for ViewModelBase {
    fn default() -> Self {
        Self {
            disposables: ResourceScope::new(),
            state: Mutex::new(LifecycleState::Uninitialized),
        }
    }
}

impl ViewModelBase {
    /// Create a fresh base
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope released when the view-model is disposed
    pub fn disposables(&self) -> &ResourceScope {
        &self.disposables
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn begin_initialize(&self) -> bool {
        let mut state = self.state.lock();
        if *state != LifecycleState::Uninitialized {
            return false;
        }
        *state = LifecycleState::Initialized;
        true
    }

    fn begin_dispose(&self) -> bool {
        let mut state = self.state.lock();
        if *state == LifecycleState::Disposed {
            return false;
        }
        *state = LifecycleState::Disposed;
        true
    }
}

/// Contract implemented by every view-model kind
///
/// The hooks default to doing nothing. Lifecycle entry points live on
/// [`ViewModelExt`] so the once-only guarantees cannot be overridden.
pub trait ViewModel: Send + Sync + 'static {
    /// Concrete kind name, e.g. `"ParentLoginViewModel"`
    const KIND: &'static str;

    /// Embedded lifecycle state
    fn base(&self) -> &ViewModelBase;

    /// Screen identifier this kind is registered under
    fn screen_id() -> ScreenId
    where
        Self: Sized,
    {
        ScreenId::from_kind(Self::KIND)
    }

    /// Runs once, on first bind
    fn initialize(&self) {}

    /// Enter transition is about to start
    fn on_appearing(&self) {}

    /// Enter transition finished; the view is interactive
    fn on_appeared(&self) {}

    /// Exit transition is about to start
    fn on_disappearing(&self) {}

    /// Exit transition finished
    fn on_disappeared(&self) {}

    /// Runs once, before the view-model's scope is released
    fn on_dispose(&self) {}
}

/// Once-only lifecycle entry points for every [`ViewModel`]
pub trait ViewModelExt: ViewModel {
    /// Run [`ViewModel::initialize`] unless it already ran or the view-model
    /// is disposed
    fn initialize_once(&self) {
        if self.base().begin_initialize() {
            tracing::trace!(kind = Self::KIND, "Initializing view-model");
            self.initialize();
        }
    }

    /// Run [`ViewModel::on_dispose`] and release the scope; idempotent
    fn dispose(&self) {
        if self.base().begin_dispose() {
            tracing::trace!(kind = Self::KIND, "Disposing view-model");
            self.on_dispose();
            self.base().disposables().dispose();
        }
    }

    /// Whether [`dispose`](ViewModelExt::dispose) has run
    fn is_disposed(&self) -> bool {
        self.base().state() == LifecycleState::Disposed
    }

    /// Current lifecycle state
    fn lifecycle(&self) -> LifecycleState {
        self.base().state()
    }
}

impl<T: ViewModel> ViewModelExt for T {}

// ============================================================================
// Popups
// ============================================================================

/// Base for popup view-models that produce a result
///
/// The completion source is owned by the view-model's scope, so disposing the
/// view-model before a result is set cancels every waiter.
pub struct PopupBase<T> {
    base: ViewModelBase,
    completion: CompletionSource<T>,
}

impl<T: Clone + Send + Sync + 'static> Default for PopupBase<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> PopupBase<T> {
    /// Create a pending popup base
    pub fn new() -> Self {
        let base = ViewModelBase::new();
        let completion = base.disposables().track(CompletionSource::new());
        Self { base, completion }
    }

    /// Embedded view-model state
    pub fn base(&self) -> &ViewModelBase {
        &self.base
    }

    /// Result source
    pub fn completion(&self) -> &CompletionSource<T> {
        &self.completion
    }
}

impl<T> std::fmt::Debug for PopupBase<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupBase").field("base", &self.base).finish_non_exhaustive()
    }
}

/// View-model of a popup yielding a typed result
pub trait PopupViewModel: ViewModel {
    /// Result type delivered to the opener
    type Output: Clone + Send + Sync + 'static;

    /// Embedded popup state
    fn popup(&self) -> &PopupBase<Self::Output>;

    /// Resolve the popup's result; later calls are ignored
    fn set_result(&self, value: Self::Output) -> bool {
        self.popup().completion().set_result(value)
    }

    /// Cancel the popup's result
    fn cancel_result(&self) -> bool {
        self.popup().completion().cancel()
    }

    /// Future resolving when the result is set or canceled
    fn result(&self) -> ResultFuture<Self::Output> {
        self.popup().completion().result()
    }
}
