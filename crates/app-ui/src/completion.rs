//! Single-assignment results for popups
//!
//! A [`CompletionSource`] resolves at most once, either with a value or as
//! canceled. Waiters hold a [`ResultFuture`], which never keeps the source
//! alive: if every source handle is dropped while still pending, waiters
//! observe [`Completion::Canceled`] instead of hanging.

use std::sync::Arc;
use tokio::sync::watch;

use app_state::Disposable;

#[derive(Debug, Clone)]
enum Slot<T> {
    Pending,
    Resolved(T),
    Canceled,
}

/// Final state of a [`CompletionSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    /// Resolved with a value
    Resolved(T),
    /// Canceled before a value was set
    Canceled,
}

impl<T> Completion<T> {
    /// The resolved value, if any
    pub fn value(self) -> Option<T> {
        match self {
            Completion::Resolved(value) => Some(value),
            Completion::Canceled => None,
        }
    }
}

/// Producer side of a single-assignment result
pub struct CompletionSource<T> {
    tx: Arc<watch::Sender<Slot<T>>>,
}

impl<T> Clone for CompletionSource<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for CompletionSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> CompletionSource<T> {
    /// Create a pending source
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Slot::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Resolve with `value`; returns `false` if already completed
    pub fn set_result(&self, value: T) -> bool {
        self.complete(Slot::Resolved(value))
    }

    /// Cancel; returns `false` if already completed
    pub fn cancel(&self) -> bool {
        self.complete(Slot::Canceled)
    }

    /// Whether a value or a cancellation has been recorded
    pub fn is_completed(&self) -> bool {
        !matches!(*self.tx.borrow(), Slot::Pending)
    }

    /// Future resolving to the final state
    pub fn result(&self) -> ResultFuture<T> {
        ResultFuture {
            rx: self.tx.subscribe(),
        }
    }

    fn complete(&self, outcome: Slot<T>) -> bool {
        let mut outcome = Some(outcome);
        self.tx.send_if_modified(|slot| {
            if !matches!(slot, Slot::Pending) {
                return false;
            }
            if let Some(outcome) = outcome.take() {
                *slot = outcome;
            }
            true
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Disposable for CompletionSource<T> {
    fn dispose(&self) {
        self.cancel();
    }
}

/// Consumer side of a [`CompletionSource`]
pub struct ResultFuture<T> {
    rx: watch::Receiver<Slot<T>>,
}

impl<T: Clone + Send + Sync + 'static> ResultFuture<T> {
    /// Wait for the source to resolve or cancel
    pub async fn wait(mut self) -> Completion<T> {
        let settled = match self.rx.wait_for(|slot| !matches!(slot, Slot::Pending)).await {
            Ok(slot) => slot.clone(),
            // Every source handle dropped while pending.
            Err(_) => Slot::Canceled,
        };
        match settled {
            Slot::Resolved(value) => Completion::Resolved(value),
            Slot::Pending | Slot::Canceled => Completion::Canceled,
        }
    }
}
