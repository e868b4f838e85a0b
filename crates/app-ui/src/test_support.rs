//! Fixtures shared by the router tests

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::identity::ScreenId;
use crate::popup::PopupCloser;
use crate::registry::ScreenRegistry;
use crate::stage::{Layer, MemoryStage, Stage, VisualId};
use crate::view::{BindContext, Bindable};
use crate::view_model::{PopupBase, PopupViewModel, ViewModel, ViewModelBase};

/// Counts view-model construction and disposal, and records dispose order
#[derive(Default)]
pub(crate) struct Tracker {
    created: AtomicUsize,
    disposed: AtomicUsize,
    dispose_order: Mutex<Vec<String>>,
}

impl Tracker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn alive(&self) -> usize {
        self.created() - self.disposed()
    }

    pub(crate) fn dispose_order(&self) -> Vec<String> {
        self.dispose_order.lock().clone()
    }
}

macro_rules! tracked_view_model {
    ($name:ident) => {
        pub(crate) struct $name {
            base: ViewModelBase,
            tracker: Arc<Tracker>,
            pub(crate) label: String,
        }

        impl $name {
            pub(crate) fn new(tracker: &Arc<Tracker>) -> Self {
                Self::labelled(tracker, stringify!($name))
            }

            pub(crate) fn labelled(tracker: &Arc<Tracker>, label: &str) -> Self {
                tracker.created.fetch_add(1, Ordering::SeqCst);
                Self {
                    base: ViewModelBase::new(),
                    tracker: Arc::clone(tracker),
                    label: label.to_string(),
                }
            }
        }

        impl ViewModel for $name {
            const KIND: &'static str = stringify!($name);

            fn base(&self) -> &ViewModelBase {
                &self.base
            }

            fn on_dispose(&self) {
                self.tracker.disposed.fetch_add(1, Ordering::SeqCst);
                self.tracker.dispose_order.lock().push(self.label.clone());
            }
        }
    };
}

tracked_view_model!(ParentLoginViewModel);
tracked_view_model!(HomeViewModel);
tracked_view_model!(CreateChildViewModel);
tracked_view_model!(NoticePopupViewModel);

/// Popup yielding a number
pub(crate) struct AnswerPopupViewModel {
    popup: PopupBase<u32>,
    tracker: Arc<Tracker>,
}

impl AnswerPopupViewModel {
    pub(crate) fn new(tracker: &Arc<Tracker>) -> Self {
        tracker.created.fetch_add(1, Ordering::SeqCst);
        Self {
            popup: PopupBase::new(),
            tracker: Arc::clone(tracker),
        }
    }
}

impl ViewModel for AnswerPopupViewModel {
    const KIND: &'static str = "AnswerPopupViewModel";

    fn base(&self) -> &ViewModelBase {
        self.popup.base()
    }

    fn on_dispose(&self) {
        self.tracker.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

impl PopupViewModel for AnswerPopupViewModel {
    type Output = u32;

    fn popup(&self) -> &PopupBase<u32> {
        &self.popup
    }
}

/// View with no bindings
pub(crate) struct PlainView;

impl<VM: ViewModel> Bindable<VM> for PlainView {
    fn on_bind(&self, _: &Arc<VM>, _: &BindContext<'_>) {}
}

/// View that hands its popup closer to the test
#[derive(Clone, Default)]
pub(crate) struct CloserView {
    pub(crate) closers: Arc<Mutex<Vec<PopupCloser>>>,
}

impl<VM: ViewModel> Bindable<VM> for CloserView {
    fn on_bind(&self, _: &Arc<VM>, cx: &BindContext<'_>) {
        if let Some(closer) = cx.closer() {
            self.closers.lock().push(closer.clone());
        }
    }
}

pub(crate) fn screen_registry() -> ScreenRegistry {
    ScreenRegistry::builder()
        .register::<ParentLoginViewModel, _, _>(|| PlainView)
        .register::<HomeViewModel, _, _>(|| PlainView)
        .register::<CreateChildViewModel, _, _>(|| PlainView)
        .build()
        .expect("fixture registry")
}

pub(crate) fn popup_registry(view: CloserView) -> ScreenRegistry {
    let answer_view = view.clone();
    ScreenRegistry::builder()
        .register::<NoticePopupViewModel, _, _>(move || view.clone())
        .register::<AnswerPopupViewModel, _, _>(move || answer_view.clone())
        .build()
        .expect("fixture registry")
}

/// Shared, ordered record of lifecycle and stage events
pub(crate) type EventLog = Arc<Mutex<Vec<&'static str>>>;

/// Memory stage that also appends `"destroy"` to an event log
pub(crate) struct RecordingStage {
    inner: MemoryStage,
    log: EventLog,
}

impl RecordingStage {
    pub(crate) fn new(log: &EventLog) -> Self {
        Self {
            inner: MemoryStage::new(),
            log: Arc::clone(log),
        }
    }
}

impl Stage for RecordingStage {
    fn spawn(&self, layer: Layer, screen: &ScreenId) -> VisualId {
        self.inner.spawn(layer, screen)
    }

    fn set_active(&self, visual: VisualId, active: bool) {
        self.inner.set_active(visual, active);
    }

    fn set_interactable(&self, visual: VisualId, interactable: bool) {
        self.inner.set_interactable(visual, interactable);
    }

    fn set_alpha(&self, visual: VisualId, alpha: f32) {
        self.inner.set_alpha(visual, alpha);
    }

    fn set_scale(&self, visual: VisualId, scale: f32) {
        self.inner.set_scale(visual, scale);
    }

    fn destroy(&self, visual: VisualId) {
        self.log.lock().push("destroy");
        self.inner.destroy(visual);
    }
}
