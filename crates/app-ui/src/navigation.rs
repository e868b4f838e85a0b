//! Full-screen navigation router
//!
//! [`NavigationService`] keeps one current screen plus a LIFO stack of
//! suspended screens. Only one transition runs at a time: a request that
//! arrives while another is in flight is dropped and reported as
//! [`NavigationOutcome::Skipped`], never queued.
//!
//! Every construction resolves the registry *before* touching the current
//! screen, so a configuration error leaves the router exactly as it was.

use app_state::{CancelSource, CancelToken};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::identity::ScreenId;
use crate::registry::ScreenRegistry;
use crate::stage::{Layer, Stage, VisualHandle};
use crate::transition::TransitionBackend;
use crate::view::{downcast_view_model, Bindable, ErasedView, ViewHost};
use crate::view_model::ViewModel;

/// How a navigation request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The requested screen is current and has finished entering
    Completed,
    /// Dropped: another transition was in flight, or there was nowhere to go
    Skipped,
    /// Superseded by [`NavigationService::reset`] before finishing
    Canceled,
}

// ============================================================================
// Transition flag
// ============================================================================

/// Exactly-one-transition flag shared by both routers
#[derive(Debug, Default)]
pub(crate) struct BusyFlag(AtomicBool);

impl BusyFlag {
    pub(crate) fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.0))
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the flag on every exit path, including errors and drops
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================================
// NavigationService
// ============================================================================

#[derive(Clone)]
struct ScreenEntry {
    id: ScreenId,
    view: Arc<dyn ErasedView>,
}

impl ScreenEntry {
    fn is(&self, other: &ScreenEntry) -> bool {
        Arc::ptr_eq(&self.view, &other.view)
    }
}

#[derive(Default)]
struct NavState {
    current: Option<ScreenEntry>,
    stack: Vec<ScreenEntry>,
}

struct NavInner {
    registry: ScreenRegistry,
    stage: Arc<dyn Stage>,
    transition: Arc<dyn TransitionBackend>,
    state: Mutex<NavState>,
    busy: BusyFlag,
    in_flight: Mutex<Option<CancelSource>>,
}

/// Stack-based router for full screens
#[derive(Clone)]
pub struct NavigationService {
    inner: Arc<NavInner>,
}

impl NavigationService {
    /// Create a router over `registry`, spawning visuals on `stage`
    pub fn new(
        registry: ScreenRegistry,
        stage: Arc<dyn Stage>,
        transition: Arc<dyn TransitionBackend>,
    ) -> Self {
        Self {
            inner: Arc::new(NavInner {
                registry,
                stage,
                transition,
                state: Mutex::new(NavState::default()),
                busy: BusyFlag::default(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Show a new `VM` screen, suspending the current one on the stack
    ///
    /// `create` builds and configures the view-model; it runs only once the
    /// registry has produced a view for `VM`.
    pub async fn navigate_to<VM, F>(&self, create: F) -> Result<NavigationOutcome>
    where
        VM: ViewModel,
        F: FnOnce() -> VM + Send,
    {
        let Some((_busy, token)) = self.begin("navigate_to") else {
            return Ok(NavigationOutcome::Skipped);
        };
        let id = VM::screen_id();
        let view = self.resolve::<VM>(&id)?;

        if let Some(current) = self.current_entry() {
            if !current.view.animate_out(&token).await {
                return Ok(NavigationOutcome::Canceled);
            }
            current.view.visual().set_active(false);
            let mut state = self.inner.state.lock();
            if state.current.as_ref().is_some_and(|c| c.is(&current)) {
                state.current = None;
                state.stack.push(current);
            }
        }

        self.present(id, view, create, &token).await
    }

    /// Dispose the current screen and return to the one below it
    pub async fn go_back(&self) -> NavigationOutcome {
        let Some((_busy, token)) = self.begin("go_back") else {
            return NavigationOutcome::Skipped;
        };
        if !self.can_go_back() {
            tracing::debug!("Back stack empty, go_back ignored");
            return NavigationOutcome::Skipped;
        }

        if let Some(current) = self.current_entry() {
            if !current.view.animate_out(&token).await {
                return NavigationOutcome::Canceled;
            }
            self.discard(&current);
        }

        let previous = self.inner.state.lock().stack.pop();
        let Some(previous) = previous else {
            return NavigationOutcome::Canceled;
        };
        previous.view.visual().set_active(true);
        self.inner.state.lock().current = Some(previous.clone());
        tracing::debug!(screen = %previous.id, "Returned to screen");

        if previous.view.animate_in(&token).await {
            NavigationOutcome::Completed
        } else {
            NavigationOutcome::Canceled
        }
    }

    /// Dispose every screen, then show a new `VM` screen with an empty stack
    pub async fn clear_and_navigate_to<VM, F>(&self, create: F) -> Result<NavigationOutcome>
    where
        VM: ViewModel,
        F: FnOnce() -> VM + Send,
    {
        let Some((_busy, token)) = self.begin("clear_and_navigate_to") else {
            return Ok(NavigationOutcome::Skipped);
        };
        let id = VM::screen_id();
        let view = self.resolve::<VM>(&id)?;

        if let Some(current) = self.current_entry() {
            if !current.view.animate_out(&token).await {
                return Ok(NavigationOutcome::Canceled);
            }
            self.discard(&current);
        }

        let stack = std::mem::take(&mut self.inner.state.lock().stack);
        for entry in stack.into_iter().rev() {
            entry.view.teardown();
        }

        self.present(id, view, create, &token).await
    }

    /// Cancel any in-flight transition and dispose every screen
    ///
    /// The current screen goes first, then the stack top to bottom.
    pub fn reset(&self) {
        if let Some(source) = self.inner.in_flight.lock().take() {
            source.cancel();
        }
        let (current, stack) = {
            let mut state = self.inner.state.lock();
            (state.current.take(), std::mem::take(&mut state.stack))
        };
        if let Some(current) = current {
            current.view.teardown();
        }
        for entry in stack.into_iter().rev() {
            entry.view.teardown();
        }
        tracing::info!("Navigation reset");
    }

    /// Identifier of the current screen
    pub fn current_screen_id(&self) -> Option<ScreenId> {
        self.inner.state.lock().current.as_ref().map(|c| c.id.clone())
    }

    /// View-model of the current screen, if it is a `VM`
    pub fn current_view_model<VM: ViewModel>(&self) -> Option<Arc<VM>> {
        let current = self.current_entry()?;
        downcast_view_model::<VM>(current.view.as_ref())
    }

    /// Whether a suspended screen is available to go back to
    pub fn can_go_back(&self) -> bool {
        !self.inner.state.lock().stack.is_empty()
    }

    /// Number of suspended screens
    pub fn stack_depth(&self) -> usize {
        self.inner.state.lock().stack.len()
    }

    /// Whether a transition is in flight
    pub fn is_transitioning(&self) -> bool {
        self.inner.busy.is_set()
    }

    /// Registry this router resolves screens from
    pub fn registry(&self) -> &ScreenRegistry {
        &self.inner.registry
    }

    fn begin(&self, operation: &'static str) -> Option<(BusyGuard<'_>, CancelToken)> {
        let Some(busy) = self.inner.busy.try_acquire() else {
            tracing::debug!(operation, "Transition in progress, request dropped");
            return None;
        };
        let source = CancelSource::new();
        let token = source.token();
        *self.inner.in_flight.lock() = Some(source);
        Some((busy, token))
    }

    fn resolve<VM: ViewModel>(&self, id: &ScreenId) -> Result<Box<dyn Bindable<VM>>> {
        self.inner.registry.instantiate::<VM>(id).map_err(|e| {
            tracing::error!(screen = %id, "Navigation failed: {}", e);
            e
        })
    }

    fn current_entry(&self) -> Option<ScreenEntry> {
        self.inner.state.lock().current.clone()
    }

    fn discard(&self, entry: &ScreenEntry) {
        {
            let mut state = self.inner.state.lock();
            if state.current.as_ref().is_some_and(|c| c.is(entry)) {
                state.current = None;
            }
        }
        entry.view.teardown();
    }

    async fn present<VM, F>(
        &self,
        id: ScreenId,
        view: Box<dyn Bindable<VM>>,
        create: F,
        token: &CancelToken,
    ) -> Result<NavigationOutcome>
    where
        VM: ViewModel,
        F: FnOnce() -> VM + Send,
    {
        let visual = VisualHandle::spawn(Arc::clone(&self.inner.stage), Layer::Screens, &id);
        let host = ViewHost::new(view, visual, Arc::clone(&self.inner.transition));
        host.bind(Arc::new(create()));
        host.visual().set_active(true);

        let view: Arc<dyn ErasedView> = Arc::new(host);
        self.inner.state.lock().current = Some(ScreenEntry {
            id: id.clone(),
            view: Arc::clone(&view),
        });
        tracing::debug!(screen = %id, "Screen presented");

        if view.animate_in(token).await {
            Ok(NavigationOutcome::Completed)
        } else {
            Ok(NavigationOutcome::Canceled)
        }
    }
}

impl std::fmt::Debug for NavigationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationService")
            .field("current", &self.current_screen_id())
            .field("stack_depth", &self.stack_depth())
            .field("transitioning", &self.is_transitioning())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UiError;
    use crate::stage::MemoryStage;
    use crate::test_support::*;
    use crate::transition::{DrivenTransition, ManualTransitionDriver, ProceduralTransition};
    use crate::view_model::ViewModelExt;
    use std::time::Duration;

    struct Fixture {
        nav: NavigationService,
        stage: Arc<MemoryStage>,
        tracker: Arc<Tracker>,
    }

    fn fixture(transition: Arc<dyn TransitionBackend>) -> Fixture {
        let stage = Arc::new(MemoryStage::new());
        Fixture {
            nav: NavigationService::new(screen_registry(), stage.clone(), transition),
            stage,
            tracker: Tracker::new(),
        }
    }

    fn instant() -> Fixture {
        fixture(Arc::new(ProceduralTransition::instant()))
    }

    fn id(s: &str) -> Option<ScreenId> {
        Some(ScreenId::new(s))
    }

    async fn drive<T>(driver: &ManualTransitionDriver, task: tokio::task::JoinHandle<T>) -> T {
        while !task.is_finished() {
            driver.complete_all();
            tokio::task::yield_now().await;
        }
        task.await.unwrap()
    }

    #[tokio::test]
    async fn test_first_navigation() {
        let f = instant();
        let t = f.tracker.clone();

        let outcome = f
            .nav
            .navigate_to(|| ParentLoginViewModel::new(&t))
            .await
            .unwrap();

        assert_eq!(outcome, NavigationOutcome::Completed);
        assert_eq!(f.nav.current_screen_id(), id("parent-login"));
        assert!(!f.nav.can_go_back());
        assert!(!f.nav.is_transitioning());
        assert_eq!(
            f.stage.active_screens(Layer::Screens),
            vec![ScreenId::new("parent-login")]
        );
    }

    #[tokio::test]
    async fn test_navigate_suspends_current() {
        let f = instant();
        let t = f.tracker.clone();

        f.nav.navigate_to(|| ParentLoginViewModel::new(&t)).await.unwrap();
        let login = f.nav.current_view_model::<ParentLoginViewModel>().unwrap();
        f.nav.navigate_to(|| HomeViewModel::new(&t)).await.unwrap();

        assert_eq!(f.nav.current_screen_id(), id("home"));
        assert_eq!(f.nav.stack_depth(), 1);
        assert!(f.nav.can_go_back());
        assert!(!login.is_disposed());
        assert_eq!(f.stage.live_count(Layer::Screens), 2);
        assert_eq!(f.stage.active_screens(Layer::Screens), vec![ScreenId::new("home")]);
        assert!(f.nav.current_view_model::<ParentLoginViewModel>().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_navigation_drops_second() {
        let f = fixture(Arc::new(ProceduralTransition::fade(Duration::from_millis(100))));
        let t = f.tracker.clone();
        f.nav.navigate_to(|| ParentLoginViewModel::new(&t)).await.unwrap();
        let depth = f.nav.stack_depth();

        let (first, second) = tokio::join!(
            f.nav.navigate_to(|| HomeViewModel::new(&t)),
            f.nav.navigate_to(|| CreateChildViewModel::new(&t)),
        );

        assert_eq!(first.unwrap(), NavigationOutcome::Completed);
        assert_eq!(second.unwrap(), NavigationOutcome::Skipped);
        assert_eq!(f.nav.stack_depth(), depth + 1);
        assert_eq!(f.tracker.created(), 2);
        assert_eq!(f.nav.current_screen_id(), id("home"));
    }

    #[tokio::test]
    async fn test_clear_and_navigate_disposes_everything_else() {
        let f = instant();
        let t = f.tracker.clone();

        f.nav.navigate_to(|| ParentLoginViewModel::new(&t)).await.unwrap();
        for _ in 0..3 {
            f.nav.navigate_to(|| HomeViewModel::new(&t)).await.unwrap();
        }
        assert_eq!(f.nav.stack_depth(), 3);

        let outcome = f
            .nav
            .clear_and_navigate_to(|| CreateChildViewModel::new(&t))
            .await
            .unwrap();

        assert_eq!(outcome, NavigationOutcome::Completed);
        assert!(!f.nav.can_go_back());
        assert_eq!(f.tracker.disposed(), 4);
        assert_eq!(f.tracker.alive(), 1);
        assert_eq!(f.stage.live_count(Layer::Screens), 1);
        assert_eq!(f.nav.current_screen_id(), id("create-child"));
    }

    #[tokio::test]
    async fn test_clear_disposes_current_then_stack_top_first() {
        let f = instant();
        let t = f.tracker.clone();

        f.nav.navigate_to(|| HomeViewModel::labelled(&t, "a")).await.unwrap();
        f.nav.navigate_to(|| HomeViewModel::labelled(&t, "b")).await.unwrap();
        f.nav.navigate_to(|| HomeViewModel::labelled(&t, "c")).await.unwrap();
        f.nav
            .clear_and_navigate_to(|| ParentLoginViewModel::new(&t))
            .await
            .unwrap();

        assert_eq!(f.tracker.dispose_order(), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_go_back_on_empty_stack_is_noop() {
        let f = instant();
        let t = f.tracker.clone();
        f.nav.navigate_to(|| HomeViewModel::new(&t)).await.unwrap();
        let spawned = f.stage.spawned_count();

        assert_eq!(f.nav.go_back().await, NavigationOutcome::Skipped);

        assert_eq!(f.nav.current_screen_id(), id("home"));
        assert_eq!(f.tracker.created(), 1);
        assert_eq!(f.tracker.disposed(), 0);
        assert_eq!(f.stage.spawned_count(), spawned);
        assert!(!f.nav.is_transitioning());
    }

    #[tokio::test]
    async fn test_go_back_restores_suspended_instance() {
        let f = instant();
        let t = f.tracker.clone();

        f.nav.navigate_to(|| ParentLoginViewModel::new(&t)).await.unwrap();
        let login = f.nav.current_view_model::<ParentLoginViewModel>().unwrap();
        f.nav.navigate_to(|| HomeViewModel::new(&t)).await.unwrap();
        let home = f.nav.current_view_model::<HomeViewModel>().unwrap();

        assert_eq!(f.nav.go_back().await, NavigationOutcome::Completed);

        assert!(home.is_disposed());
        assert!(!login.is_disposed());
        let restored = f.nav.current_view_model::<ParentLoginViewModel>().unwrap();
        assert!(Arc::ptr_eq(&restored, &login));
        assert_eq!(f.nav.stack_depth(), 0);
        assert_eq!(
            f.stage.active_screens(Layer::Screens),
            vec![ScreenId::new("parent-login")]
        );
        assert_eq!(f.stage.live_count(Layer::Screens), 1);
    }

    #[tokio::test]
    async fn test_missing_screen_leaves_router_untouched() {
        let stage = Arc::new(MemoryStage::new());
        let registry = ScreenRegistry::builder()
            .register::<HomeViewModel, _, _>(|| PlainView)
            .build()
            .unwrap();
        let nav = NavigationService::new(
            registry,
            stage.clone(),
            Arc::new(ProceduralTransition::instant()),
        );
        let t = Tracker::new();
        nav.navigate_to(|| HomeViewModel::new(&t)).await.unwrap();

        let err = nav
            .navigate_to(|| CreateChildViewModel::new(&t))
            .await
            .unwrap_err();

        assert!(matches!(err, UiError::ScreenNotFound(ref id) if id.as_str() == "create-child"));
        assert!(!nav.is_transitioning());
        assert_eq!(nav.current_screen_id(), id("home"));
        assert_eq!(nav.stack_depth(), 0);
        assert_eq!(t.created(), 1);
        assert_eq!(stage.spawned_count(), 1);
        assert_eq!(stage.active_screens(Layer::Screens), vec![ScreenId::new("home")]);

        let err = nav
            .clear_and_navigate_to(|| CreateChildViewModel::new(&t))
            .await
            .unwrap_err();
        assert!(matches!(err, UiError::ScreenNotFound(_)));
        assert_eq!(nav.current_screen_id(), id("home"));
    }

    #[tokio::test]
    async fn test_wrong_view_is_a_configuration_error() {
        let stage = Arc::new(MemoryStage::new());
        let registry = ScreenRegistry::builder()
            .insert(
                ScreenId::new("home"),
                crate::registry::ViewFactory::new::<ParentLoginViewModel, _, _>(|| PlainView),
            )
            .build()
            .unwrap();
        let nav = NavigationService::new(registry, stage.clone(), Arc::new(ProceduralTransition::instant()));
        let t = Tracker::new();

        let err = nav.navigate_to(|| HomeViewModel::new(&t)).await.unwrap_err();

        assert!(matches!(err, UiError::MissingBindingContract { .. }));
        assert_eq!(t.created(), 0);
        assert_eq!(stage.spawned_count(), 0);
        assert!(!nav.is_transitioning());
    }

    #[tokio::test]
    async fn test_transition_flag_spans_the_transition() {
        let driver = Arc::new(ManualTransitionDriver::new());
        let f = fixture(Arc::new(DrivenTransition::new(driver.clone())));
        let t = f.tracker.clone();

        let task = {
            let nav = f.nav.clone();
            let t = t.clone();
            tokio::spawn(async move { nav.navigate_to(|| HomeViewModel::new(&t)).await })
        };
        while driver.pending() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(f.nav.is_transitioning());
        assert_eq!(f.nav.go_back().await, NavigationOutcome::Skipped);
        let home = f.nav.current_view_model::<HomeViewModel>().unwrap();
        assert_eq!(f.stage.live_count(Layer::Screens), 1);

        assert_eq!(drive(&driver, task).await.unwrap(), NavigationOutcome::Completed);
        assert!(!f.nav.is_transitioning());
        assert!(!home.is_disposed());
    }

    #[tokio::test]
    async fn test_reset_cancels_in_flight_transition() {
        let driver = Arc::new(ManualTransitionDriver::new());
        let f = fixture(Arc::new(DrivenTransition::new(driver.clone())));
        let t = f.tracker.clone();

        let first = {
            let nav = f.nav.clone();
            let t = t.clone();
            tokio::spawn(async move { nav.navigate_to(|| ParentLoginViewModel::new(&t)).await })
        };
        drive(&driver, first).await.unwrap();

        let task = {
            let nav = f.nav.clone();
            let t = t.clone();
            tokio::spawn(async move { nav.navigate_to(|| HomeViewModel::new(&t)).await })
        };
        while driver.pending() == 0 {
            tokio::task::yield_now().await;
        }
        f.nav.reset();

        assert_eq!(task.await.unwrap().unwrap(), NavigationOutcome::Canceled);
        assert!(!f.nav.is_transitioning());
        assert_eq!(f.nav.current_screen_id(), None);
        assert_eq!(f.tracker.alive(), 0);
        assert_eq!(f.stage.live_count(Layer::Screens), 0);
        assert_eq!(f.tracker.created(), 1);
    }
}
