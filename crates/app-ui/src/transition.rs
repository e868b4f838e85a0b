//! Transition backends
//!
//! A view plays its enter and exit transitions through a
//! [`TransitionBackend`], whose `play` future is the single "transition
//! complete" signal. Two backends ship with the crate:
//!
//! - [`ProceduralTransition`] tweens alpha (and optionally scale) frame by
//!   frame on the tokio timer.
//! - [`DrivenTransition`] hands the visual to an external
//!   [`TransitionDriver`] and waits for its completion signal.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::stage::{VisualHandle, VisualId};

/// Which way a visual is moving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionDirection {
    /// Becoming visible
    Enter,
    /// Going away
    Exit,
}

/// Produces the completion signal for a view's transitions
#[async_trait]
pub trait TransitionBackend: Send + Sync + 'static {
    /// Play the transition; resolves once it is complete
    async fn play(&self, visual: &VisualHandle, direction: TransitionDirection);
}

// ============================================================================
// Configuration
// ============================================================================

/// Timing of the procedural transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Screen fade duration in milliseconds
    pub fade_ms: u64,
    /// Popup scale duration in milliseconds
    pub scale_ms: u64,
    /// Frame step in milliseconds
    pub frame_ms: u64,
    /// Popup scale at the start of an enter transition
    pub scale_from: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            fade_ms: 350,
            scale_ms: 300,
            frame_ms: 16,
            scale_from: 0.8,
        }
    }
}

impl TransitionConfig {
    /// Fade used for full screens
    pub fn screen_transition(&self) -> ProceduralTransition {
        ProceduralTransition::fade(Duration::from_millis(self.fade_ms))
            .with_frame(Duration::from_millis(self.frame_ms))
    }

    /// Scale-and-fade used for popups
    pub fn popup_transition(&self) -> ProceduralTransition {
        ProceduralTransition::scale(Duration::from_millis(self.scale_ms), self.scale_from)
            .with_frame(Duration::from_millis(self.frame_ms))
    }
}

// ============================================================================
// Procedural backend
// ============================================================================

/// Easing curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    /// No easing
    Linear,
    /// Fast start, slow end
    OutCubic,
    /// Slow start, fast end
    InCubic,
    /// Overshoots the target slightly before settling
    OutBack,
    /// Slow at both ends
    InOutQuad,
}

impl Ease {
    /// Map linear progress `t` in `[0, 1]` through the curve
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::OutCubic => 1.0 - (1.0 - t).powi(3),
            Ease::InCubic => t.powi(3),
            Ease::OutBack => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Ease::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tween {
    Fade,
    Scale { from: f32 },
}

/// Frame-stepped tween on the tokio timer
#[derive(Debug, Clone)]
pub struct ProceduralTransition {
    tween: Tween,
    duration: Duration,
    frame: Duration,
}

impl ProceduralTransition {
    /// Alpha tween, eased out on enter and in on exit
    pub fn fade(duration: Duration) -> Self {
        Self {
            tween: Tween::Fade,
            duration,
            frame: Duration::from_millis(16),
        }
    }

    /// Scale tween from `from` to full size, with an alpha fade
    pub fn scale(duration: Duration, from: f32) -> Self {
        Self {
            tween: Tween::Scale { from },
            duration,
            frame: Duration::from_millis(16),
        }
    }

    /// Transition that completes without suspending
    pub fn instant() -> Self {
        Self::fade(Duration::ZERO)
    }

    /// Override the frame step
    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame.max(Duration::from_millis(1));
        self
    }

    /// Configured duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn apply(&self, visual: &VisualHandle, direction: TransitionDirection, t: f32) {
        let (alpha_ease, scale_ease) = match direction {
            TransitionDirection::Enter => (Ease::OutCubic, Ease::OutBack),
            TransitionDirection::Exit => (Ease::InCubic, Ease::InCubic),
        };
        let alpha = match direction {
            TransitionDirection::Enter => alpha_ease.apply(t),
            TransitionDirection::Exit => 1.0 - alpha_ease.apply(t),
        };
        visual.set_alpha(alpha);

        if let Tween::Scale { from } = self.tween {
            let eased = scale_ease.apply(t);
            let scale = match direction {
                TransitionDirection::Enter => from + (1.0 - from) * eased,
                TransitionDirection::Exit => 1.0 + (from - 1.0) * eased,
            };
            visual.set_scale(scale);
        }
    }
}

#[async_trait]
impl TransitionBackend for ProceduralTransition {
    async fn play(&self, visual: &VisualHandle, direction: TransitionDirection) {
        self.apply(visual, direction, 0.0);
        if self.duration.is_zero() {
            self.apply(visual, direction, 1.0);
            return;
        }

        let frames = self.duration.as_nanos().div_ceil(self.frame.as_nanos()).max(1);
        let mut ticker = tokio::time::interval(self.frame);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;
        for frame in 1..=frames {
            ticker.tick().await;
            self.apply(visual, direction, frame as f32 / frames as f32);
        }
    }
}

// ============================================================================
// Driven backend
// ============================================================================

/// External machinery that animates a visual and reports completion
///
/// Dropping the returned sender without sending counts as completion.
pub trait TransitionDriver: Send + Sync + 'static {
    /// Start animating `visual`; the receiver fires when done
    fn start(&self, visual: VisualId, direction: TransitionDirection) -> oneshot::Receiver<()>;
}

/// Backend that waits on a [`TransitionDriver`]
#[derive(Clone)]
pub struct DrivenTransition {
    driver: Arc<dyn TransitionDriver>,
}

impl DrivenTransition {
    /// Wrap a driver
    pub fn new(driver: Arc<dyn TransitionDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl TransitionBackend for DrivenTransition {
    async fn play(&self, visual: &VisualHandle, direction: TransitionDirection) {
        let done = self.driver.start(visual.id(), direction);
        if done.await.is_err() {
            tracing::debug!(visual = %visual.id(), ?direction, "Transition driver dropped its signal");
        }
        if direction == TransitionDirection::Enter {
            visual.set_alpha(1.0);
        }
    }
}

struct PendingTransition {
    visual: VisualId,
    direction: TransitionDirection,
    done: oneshot::Sender<()>,
}

/// Driver whose transitions complete only when told to
#[derive(Default)]
pub struct ManualTransitionDriver {
    pending: Mutex<Vec<PendingTransition>>,
}

impl ManualTransitionDriver {
    /// Create a driver with nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of started, uncompleted transitions
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Directions of the pending transitions, oldest first
    pub fn pending_directions(&self) -> Vec<TransitionDirection> {
        self.pending.lock().iter().map(|p| p.direction).collect()
    }

    /// Visuals with pending transitions, oldest first
    pub fn pending_visuals(&self) -> Vec<VisualId> {
        self.pending.lock().iter().map(|p| p.visual).collect()
    }

    /// Complete the oldest pending transition
    pub fn complete_next(&self) -> bool {
        let next = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            }
        };
        match next {
            Some(p) => {
                let _ = p.done.send(());
                true
            }
            None => false,
        }
    }

    /// Complete every pending transition
    pub fn complete_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain(..).collect();
        let count = drained.len();
        for p in drained {
            let _ = p.done.send(());
        }
        count
    }
}

impl TransitionDriver for ManualTransitionDriver {
    fn start(&self, visual: VisualId, direction: TransitionDirection) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        self.pending.lock().push(PendingTransition {
            visual,
            direction,
            done,
        });
        rx
    }
}
