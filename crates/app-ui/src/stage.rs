//! Visual stage boundary
//!
//! The routers never render anything themselves. They ask a [`Stage`] to
//! spawn, show, fade and destroy visual instances, and address those
//! instances through a [`VisualHandle`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::identity::ScreenId;

/// Container a visual instance is spawned into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Full-screen navigation container
    Screens,
    /// Modal overlay container, drawn above screens
    Popups,
}

/// Identity of one spawned visual instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualId(Uuid);

impl VisualId {
    /// Fresh random identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VisualId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VisualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Rendering backend the routers drive
///
/// Operations on an unknown or destroyed visual are ignored.
pub trait Stage: Send + Sync + 'static {
    /// Create a visual instance for `screen`, initially inactive
    fn spawn(&self, layer: Layer, screen: &ScreenId) -> VisualId;

    /// Show or hide the instance
    fn set_active(&self, visual: VisualId, active: bool);

    /// Enable or disable input on the instance
    fn set_interactable(&self, visual: VisualId, interactable: bool);

    /// Opacity in `[0, 1]`
    fn set_alpha(&self, visual: VisualId, alpha: f32);

    /// Uniform scale
    fn set_scale(&self, visual: VisualId, scale: f32);

    /// Destroy the instance
    fn destroy(&self, visual: VisualId);
}

/// A visual instance together with the stage that owns it
#[derive(Clone)]
pub struct VisualHandle {
    id: VisualId,
    stage: Arc<dyn Stage>,
}

impl VisualHandle {
    /// Spawn a new instance on `stage`
    pub fn spawn(stage: Arc<dyn Stage>, layer: Layer, screen: &ScreenId) -> Self {
        let id = stage.spawn(layer, screen);
        Self { id, stage }
    }

    /// Instance identity
    pub fn id(&self) -> VisualId {
        self.id
    }

    /// See [`Stage::set_active`]
    pub fn set_active(&self, active: bool) {
        self.stage.set_active(self.id, active);
    }

    /// See [`Stage::set_interactable`]
    pub fn set_interactable(&self, interactable: bool) {
        self.stage.set_interactable(self.id, interactable);
    }

    /// See [`Stage::set_alpha`]
    pub fn set_alpha(&self, alpha: f32) {
        self.stage.set_alpha(self.id, alpha);
    }

    /// See [`Stage::set_scale`]
    pub fn set_scale(&self, scale: f32) {
        self.stage.set_scale(self.id, scale);
    }

    /// See [`Stage::destroy`]
    pub fn destroy(&self) {
        self.stage.destroy(self.id);
    }
}

impl fmt::Debug for VisualHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VisualHandle").field(&self.id).finish()
    }
}

// ============================================================================
// MemoryStage
// ============================================================================

/// Snapshot of one instance held by a [`MemoryStage`]
#[derive(Debug, Clone, PartialEq)]
pub struct VisualState {
    /// Container the instance lives in
    pub layer: Layer,
    /// Screen the instance was spawned for
    pub screen: ScreenId,
    /// Whether it is shown
    pub active: bool,
    /// Whether it accepts input
    pub interactable: bool,
    /// Current opacity
    pub alpha: f32,
    /// Current scale
    pub scale: f32,
}

#[derive(Default)]
struct MemoryStageState {
    live: HashMap<VisualId, VisualState>,
    order: Vec<VisualId>,
    spawned: usize,
    destroyed: usize,
}

/// Headless stage that records every instance in memory
#[derive(Default)]
pub struct MemoryStage {
    state: Mutex<MemoryStageState>,
}

impl MemoryStage {
    /// Create an empty stage
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a live instance
    pub fn visual(&self, id: VisualId) -> Option<VisualState> {
        self.state.lock().live.get(&id).cloned()
    }

    /// Number of live instances in `layer`
    pub fn live_count(&self, layer: Layer) -> usize {
        self.state
            .lock()
            .live
            .values()
            .filter(|v| v.layer == layer)
            .count()
    }

    /// Screens of the live instances in `layer`, oldest first
    pub fn live_screens(&self, layer: Layer) -> Vec<ScreenId> {
        let state = self.state.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.live.get(id))
            .filter(|v| v.layer == layer)
            .map(|v| v.screen.clone())
            .collect()
    }

    /// Screens of the active instances in `layer`, oldest first
    pub fn active_screens(&self, layer: Layer) -> Vec<ScreenId> {
        let state = self.state.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.live.get(id))
            .filter(|v| v.layer == layer && v.active)
            .map(|v| v.screen.clone())
            .collect()
    }

    /// Total instances ever spawned
    pub fn spawned_count(&self) -> usize {
        self.state.lock().spawned
    }

    /// Total instances destroyed
    pub fn destroyed_count(&self) -> usize {
        self.state.lock().destroyed
    }

    fn modify(&self, id: VisualId, f: impl FnOnce(&mut VisualState)) {
        if let Some(visual) = self.state.lock().live.get_mut(&id) {
            f(visual);
        }
    }
}

impl Stage for MemoryStage {
    fn spawn(&self, layer: Layer, screen: &ScreenId) -> VisualId {
        let id = VisualId::new();
        let mut state = self.state.lock();
        state.live.insert(
            id,
            VisualState {
                layer,
                screen: screen.clone(),
                active: false,
                interactable: false,
                alpha: 1.0,
                scale: 1.0,
            },
        );
        state.order.push(id);
        state.spawned += 1;
        id
    }

    fn set_active(&self, visual: VisualId, active: bool) {
        self.modify(visual, |v| v.active = active);
    }

    fn set_interactable(&self, visual: VisualId, interactable: bool) {
        self.modify(visual, |v| v.interactable = interactable);
    }

    fn set_alpha(&self, visual: VisualId, alpha: f32) {
        self.modify(visual, |v| v.alpha = alpha);
    }

    fn set_scale(&self, visual: VisualId, scale: f32) {
        self.modify(visual, |v| v.scale = scale);
    }

    fn destroy(&self, visual: VisualId) {
        let mut state = self.state.lock();
        if state.live.remove(&visual).is_some() {
            state.order.retain(|id| *id != visual);
            state.destroyed += 1;
        }
    }
}

impl fmt::Debug for MemoryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryStage")
            .field("live", &state.live.len())
            .field("spawned", &state.spawned)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
