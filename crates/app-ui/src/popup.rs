//! Modal overlay router
//!
//! [`PopupService`] keeps its own LIFO stack of popups above the navigation
//! stack. A background dim is visible whenever at least one popup is open.
//!
//! Closing is identity-checked: [`PopupService::close_top`] only closes the
//! popup whose [`PopupKey`] the caller names, and only while it is still on
//! top. Self-close requests from popup views ([`PopupCloser`]) take the same
//! path, so a stale request from a superseded popup never closes a newer one.

use app_state::{BackgroundTasks, CancelSource, CancelToken, ReactiveValue, ReadOnlyValue};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::completion::Completion;
use crate::error::Result;
use crate::identity::ScreenId;
use crate::navigation::BusyFlag;
use crate::registry::ScreenRegistry;
use crate::stage::{Layer, Stage, VisualHandle};
use crate::transition::TransitionBackend;
use crate::view::{downcast_view_model, ErasedView, ViewHost};
use crate::view_model::{PopupViewModel, ViewModel};

/// Identity of one open popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupKey(Uuid);

impl PopupKey {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PopupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How a popup shown for its result ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupOutcome<T> {
    /// The popup set a result
    Resolved(T),
    /// The popup was disposed or canceled before setting a result
    Canceled,
    /// Not shown: another popup was still entering
    Dropped,
}

impl<T> PopupOutcome<T> {
    /// The resolved value, if any
    pub fn value(self) -> Option<T> {
        match self {
            PopupOutcome::Resolved(value) => Some(value),
            PopupOutcome::Canceled | PopupOutcome::Dropped => None,
        }
    }
}

struct PopupEntry {
    key: PopupKey,
    id: ScreenId,
    view: Arc<dyn ErasedView>,
    entering: CancelSource,
    exiting: CancelSource,
}

struct PopupInner {
    registry: ScreenRegistry,
    stage: Arc<dyn Stage>,
    transition: Arc<dyn TransitionBackend>,
    stack: Mutex<Vec<PopupEntry>>,
    /// Popups popped by `close_top` whose exit has not finished
    closing: Mutex<Vec<PopupEntry>>,
    showing: BusyFlag,
    dim: ReactiveValue<bool>,
    tasks: BackgroundTasks,
}

impl PopupInner {
    fn update_dim(&self) {
        let visible = !self.stack.lock().is_empty();
        self.dim.set(visible);
    }
}

/// Stack-based router for modal popups
#[derive(Clone)]
pub struct PopupService {
    inner: Arc<PopupInner>,
}

impl PopupService {
    /// Create a router over `registry`, spawning visuals on `stage`
    pub fn new(
        registry: ScreenRegistry,
        stage: Arc<dyn Stage>,
        transition: Arc<dyn TransitionBackend>,
    ) -> Self {
        Self {
            inner: Arc::new(PopupInner {
                registry,
                stage,
                transition,
                stack: Mutex::new(Vec::new()),
                closing: Mutex::new(Vec::new()),
                showing: BusyFlag::default(),
                dim: ReactiveValue::new(false),
                tasks: BackgroundTasks::new(),
            }),
        }
    }

    /// Open a `VM` popup on top of the stack
    ///
    /// Resolves once the popup has entered. Returns `Ok(None)` when dropped
    /// because another popup was still being shown.
    pub async fn show_popup<VM, F>(&self, create: F) -> Result<Option<PopupKey>>
    where
        VM: ViewModel,
        F: FnOnce() -> VM + Send,
    {
        Ok(self.open(create).await?.map(|(key, _)| key))
    }

    /// Open a `VM` popup and wait for its result
    pub async fn show_popup_for_result<VM, F>(
        &self,
        create: F,
    ) -> Result<PopupOutcome<VM::Output>>
    where
        VM: PopupViewModel,
        F: FnOnce() -> VM + Send,
    {
        let Some((key, vm)) = self.open(create).await? else {
            return Ok(PopupOutcome::Dropped);
        };
        let result = vm.result();
        drop(vm);

        match result.wait().await {
            Completion::Resolved(value) => Ok(PopupOutcome::Resolved(value)),
            Completion::Canceled => {
                tracing::debug!(popup = %key, "Popup result canceled");
                Ok(PopupOutcome::Canceled)
            }
        }
    }

    /// Close the popup identified by `expected` if it is still on top
    ///
    /// Returns `false` when another popup is on top or the stack is empty.
    pub async fn close_top(&self, expected: PopupKey) -> bool {
        let entry = {
            let mut stack = self.inner.stack.lock();
            match stack.last() {
                Some(top) if top.key == expected => stack.pop(),
                _ => None,
            }
        };
        let Some(entry) = entry else {
            tracing::debug!(popup = %expected, "Stale popup close ignored");
            return false;
        };

        entry.entering.cancel();
        let key = entry.key;
        let view = Arc::clone(&entry.view);
        let exit = entry.exiting.token();
        self.inner.closing.lock().push(entry);
        self.inner.update_dim();

        view.animate_out(&exit).await;

        // close_all may have torn the popup down while it was exiting.
        let entry = {
            let mut closing = self.inner.closing.lock();
            closing
                .iter()
                .position(|e| e.key == key)
                .map(|index| closing.remove(index))
        };
        if let Some(entry) = entry {
            entry.view.teardown();
            tracing::debug!(popup = %entry.key, screen = %entry.id, "Popup closed");
        }
        true
    }

    /// Dispose every popup, top first, without exit transitions
    ///
    /// Popups still playing their exit transition are torn down as well.
    pub fn close_all(&self) {
        let entries = std::mem::take(&mut *self.inner.stack.lock());
        let closing = std::mem::take(&mut *self.inner.closing.lock());
        for entry in entries.into_iter().rev().chain(closing.into_iter().rev()) {
            entry.entering.cancel();
            entry.exiting.cancel();
            entry.view.teardown();
        }
        self.inner.update_dim();
    }

    /// Whether any popup is open
    pub fn has_active_popup(&self) -> bool {
        !self.inner.stack.lock().is_empty()
    }

    /// Number of open popups
    pub fn depth(&self) -> usize {
        self.inner.stack.lock().len()
    }

    /// Key of the top popup
    pub fn top_key(&self) -> Option<PopupKey> {
        self.inner.stack.lock().last().map(|e| e.key)
    }

    /// View-model of the top popup, if it is a `VM`
    pub fn top_view_model<VM: ViewModel>(&self) -> Option<Arc<VM>> {
        let view = self.inner.stack.lock().last().map(|e| Arc::clone(&e.view))?;
        downcast_view_model::<VM>(view.as_ref())
    }

    /// Background dim toggle; `true` while any popup is open
    pub fn dim_visible(&self) -> ReadOnlyValue<bool> {
        self.inner.dim.read_only()
    }

    /// Registry this router resolves popups from
    pub fn registry(&self) -> &ScreenRegistry {
        &self.inner.registry
    }

    /// Wait for pending self-close requests to finish
    pub async fn wait_idle(&self) {
        self.inner.tasks.wait_idle().await;
    }

    async fn open<VM, F>(&self, create: F) -> Result<Option<(PopupKey, Arc<VM>)>>
    where
        VM: ViewModel,
        F: FnOnce() -> VM + Send,
    {
        let Some(_showing) = self.inner.showing.try_acquire() else {
            tracing::debug!(kind = VM::KIND, "Popup still entering, request dropped");
            return Ok(None);
        };
        let id = VM::screen_id();
        let view = self.inner.registry.instantiate::<VM>(&id).map_err(|e| {
            tracing::error!(screen = %id, "Popup failed: {}", e);
            e
        })?;

        let key = PopupKey::new();
        let vm = Arc::new(create());
        let visual = VisualHandle::spawn(Arc::clone(&self.inner.stage), Layer::Popups, &id);
        let host = ViewHost::new(view, visual, Arc::clone(&self.inner.transition)).with_closer(
            PopupCloser {
                key,
                service: Arc::downgrade(&self.inner),
            },
        );
        host.bind(Arc::clone(&vm));
        host.visual().set_active(true);

        let view: Arc<dyn ErasedView> = Arc::new(host);
        let entering = CancelSource::new();
        let token = entering.token();
        self.inner.stack.lock().push(PopupEntry {
            key,
            id: id.clone(),
            view: Arc::clone(&view),
            entering,
            exiting: CancelSource::new(),
        });
        self.inner.update_dim();
        tracing::debug!(popup = %key, screen = %id, "Popup opened");

        view.animate_in(&token).await;
        Ok(Some((key, vm)))
    }
}

impl fmt::Debug for PopupService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupService")
            .field("depth", &self.depth())
            .field("top", &self.top_key())
            .finish()
    }
}

/// Lets a popup view ask for its own popup to close
#[derive(Clone)]
pub struct PopupCloser {
    key: PopupKey,
    service: Weak<PopupInner>,
}

impl PopupCloser {
    /// Key of the popup this closer belongs to
    pub fn key(&self) -> PopupKey {
        self.key
    }

    /// Schedule an identity-checked close of this popup
    ///
    /// Does nothing once the service is gone or the popup is no longer on top
    /// when the request runs.
    pub fn request_close(&self) {
        let Some(inner) = self.service.upgrade() else {
            return;
        };
        let tasks = inner.tasks.clone();
        let service = PopupService { inner };
        let key = self.key;
        tasks.spawn("popup-close", async move {
            service.close_top(key).await;
            Ok::<(), std::convert::Infallible>(())
        });
    }
}

impl fmt::Debug for PopupCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PopupCloser").field(&self.key).finish()
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
        popups: PopupService,
        stage: Arc<MemoryStage>,
        tracker: Arc<Tracker>,
        view: CloserView,
    }

    fn fixture(transition: Arc<dyn TransitionBackend>) -> Fixture {
        let stage = Arc::new(MemoryStage::new());
        let view = CloserView::default();
        Fixture {
            popups: PopupService::new(popup_registry(view.clone()), stage.clone(), transition),
            stage,
            tracker: Tracker::new(),
            view,
        }
    }

    fn instant() -> Fixture {
        fixture(Arc::new(ProceduralTransition::instant()))
    }

    async fn until(mut condition: impl FnMut() -> bool) {
        while !condition() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_show_and_close() {
        let f = instant();
        let t = f.tracker.clone();

        let key = f
            .popups
            .show_popup(|| NoticePopupViewModel::new(&t))
            .await
            .unwrap()
            .unwrap();

        assert!(f.popups.has_active_popup());
        assert!(f.popups.dim_visible().get());
        assert_eq!(f.popups.top_key(), Some(key));
        let vm = f.popups.top_view_model::<NoticePopupViewModel>().unwrap();

        assert!(f.popups.close_top(key).await);
        assert!(!f.popups.has_active_popup());
        assert!(!f.popups.dim_visible().get());
        assert!(vm.is_disposed());
        assert_eq!(f.stage.live_count(Layer::Popups), 0);
        assert!(!f.popups.close_top(key).await);
    }

    #[tokio::test]
    async fn test_result_is_exact_value() {
        let f = instant();
        let t = f.tracker.clone();

        let task = {
            let popups = f.popups.clone();
            tokio::spawn(async move {
                popups
                    .show_popup_for_result(|| AnswerPopupViewModel::new(&t))
                    .await
            })
        };
        until(|| f.popups.top_view_model::<AnswerPopupViewModel>().is_some()).await;
        let vm = f.popups.top_view_model::<AnswerPopupViewModel>().unwrap();
        assert!(vm.set_result(7));
        assert!(!vm.set_result(8));

        assert_eq!(task.await.unwrap().unwrap(), PopupOutcome::Resolved(7));
        assert_eq!(f.popups.depth(), 1);
    }

    #[tokio::test]
    async fn test_result_canceled_when_closed_first() {
        let f = instant();
        let t = f.tracker.clone();

        let task = {
            let popups = f.popups.clone();
            tokio::spawn(async move {
                popups
                    .show_popup_for_result(|| AnswerPopupViewModel::new(&t))
                    .await
            })
        };
        until(|| f.popups.has_active_popup()).await;
        let key = f.popups.top_key().unwrap();
        assert!(f.popups.close_top(key).await);

        assert_eq!(task.await.unwrap().unwrap(), PopupOutcome::Canceled);
        assert_eq!(f.tracker.alive(), 0);
    }

    #[tokio::test]
    async fn test_stale_self_close_keeps_newer_popup() {
        let f = instant();
        let t = f.tracker.clone();

        let a = f
            .popups
            .show_popup(|| NoticePopupViewModel::labelled(&t, "a"))
            .await
            .unwrap()
            .unwrap();
        let closer_a = f.view.closers.lock()[0].clone();
        assert_eq!(closer_a.key(), a);

        closer_a.request_close();
        let b = f
            .popups
            .show_popup(|| NoticePopupViewModel::labelled(&t, "b"))
            .await
            .unwrap()
            .unwrap();
        f.popups.wait_idle().await;

        assert_eq!(f.popups.depth(), 2);
        assert_eq!(f.popups.top_key(), Some(b));
        assert_eq!(f.tracker.disposed(), 0);
    }

    #[tokio::test]
    async fn test_self_close_closes_own_popup() {
        let f = instant();
        let t = f.tracker.clone();

        f.popups
            .show_popup(|| NoticePopupViewModel::new(&t))
            .await
            .unwrap();
        let closer = f.view.closers.lock()[0].clone();
        closer.request_close();
        f.popups.wait_idle().await;

        assert!(!f.popups.has_active_popup());
        assert_eq!(f.tracker.disposed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_during_enter_is_dropped() {
        let f = fixture(Arc::new(ProceduralTransition::scale(
            Duration::from_millis(300),
            0.8,
        )));
        let t = f.tracker.clone();

        let (first, second) = tokio::join!(
            f.popups.show_popup(|| NoticePopupViewModel::new(&t)),
            f.popups
                .show_popup_for_result(|| AnswerPopupViewModel::new(&t)),
        );

        assert!(first.unwrap().is_some());
        assert_eq!(second.unwrap(), PopupOutcome::Dropped);
        assert_eq!(f.popups.depth(), 1);
        assert_eq!(f.tracker.created(), 1);
    }

    #[tokio::test]
    async fn test_close_all_disposes_top_first() {
        let f = instant();
        let t = f.tracker.clone();
        for label in ["a", "b", "c"] {
            f.popups
                .show_popup(|| NoticePopupViewModel::labelled(&t, label))
                .await
                .unwrap();
        }

        f.popups.close_all();

        assert_eq!(f.tracker.dispose_order(), vec!["c", "b", "a"]);
        assert_eq!(f.popups.depth(), 0);
        assert!(!f.popups.dim_visible().get());
        assert_eq!(f.stage.live_count(Layer::Popups), 0);
    }

    #[tokio::test]
    async fn test_dim_notifies_on_changes_only() {
        let f = instant();
        let t = f.tracker.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = f
            .popups
            .dim_visible()
            .subscribe(move |v| sink.lock().push(*v), true);

        let a = f.popups.show_popup(|| NoticePopupViewModel::new(&t)).await.unwrap().unwrap();
        let b = f.popups.show_popup(|| NoticePopupViewModel::new(&t)).await.unwrap().unwrap();
        f.popups.close_top(b).await;
        f.popups.close_top(a).await;

        assert_eq!(*seen.lock(), vec![false, true, false]);
    }

    #[tokio::test]
    async fn test_missing_popup_is_an_error() {
        let stage = Arc::new(MemoryStage::new());
        let popups = PopupService::new(
            ScreenRegistry::default(),
            stage.clone(),
            Arc::new(ProceduralTransition::instant()),
        );
        let t = Tracker::new();

        let err = popups
            .show_popup(|| NoticePopupViewModel::new(&t))
            .await
            .unwrap_err();
        assert!(matches!(err, UiError::ScreenNotFound(_)));
        assert_eq!(stage.spawned_count(), 0);
        assert!(!popups.has_active_popup());

        // The flag was released: a later request is not dropped.
        let err = popups
            .show_popup(|| NoticePopupViewModel::new(&t))
            .await
            .unwrap_err();
        assert!(matches!(err, UiError::ScreenNotFound(_)));
    }

    #[tokio::test]
    async fn test_closing_entering_popup_cancels_enter() {
        let driver = Arc::new(ManualTransitionDriver::new());
        let f = fixture(Arc::new(DrivenTransition::new(driver.clone())));
        let t = f.tracker.clone();

        let show = {
            let popups = f.popups.clone();
            tokio::spawn(async move { popups.show_popup(|| NoticePopupViewModel::new(&t)).await })
        };
        until(|| driver.pending() == 1).await;
        let key = f.popups.top_key().unwrap();

        let close = {
            let popups = f.popups.clone();
            tokio::spawn(async move { popups.close_top(key).await })
        };
        until(|| show.is_finished()).await;
        assert_eq!(show.await.unwrap().unwrap(), Some(key));

        while !close.is_finished() {
            driver.complete_all();
            tokio::task::yield_now().await;
        }
        assert!(close.await.unwrap());
        assert_eq!(f.tracker.alive(), 0);
    }

    #[tokio::test]
    async fn test_close_all_tears_down_popup_mid_exit() {
        let driver = Arc::new(ManualTransitionDriver::new());
        let f = fixture(Arc::new(DrivenTransition::new(driver.clone())));
        let t = f.tracker.clone();

        let show = {
            let popups = f.popups.clone();
            tokio::spawn(async move { popups.show_popup(|| NoticePopupViewModel::new(&t)).await })
        };
        until(|| driver.pending() == 1).await;
        driver.complete_all();
        let key = show.await.unwrap().unwrap().unwrap();

        let close = {
            let popups = f.popups.clone();
            tokio::spawn(async move { popups.close_top(key).await })
        };
        until(|| driver.pending() == 1).await;
        assert_eq!(f.popups.depth(), 0);
        assert_eq!(f.tracker.alive(), 1);

        f.popups.close_all();

        assert_eq!(f.tracker.alive(), 0);
        assert_eq!(f.stage.live_count(Layer::Popups), 0);
        assert!(!f.popups.dim_visible().get());

        // The canceled exit lets the pending close finish without a second teardown.
        assert!(close.await.unwrap());
        assert_eq!(f.tracker.disposed(), 1);
        assert_eq!(f.stage.destroyed_count(), 1);
    }
}
