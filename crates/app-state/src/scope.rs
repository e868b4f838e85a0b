//! Disposable handles and aggregate teardown
//!
//! A [`ResourceScope`] collects everything a view-model (or a view binding)
//! has to release: reactive subscriptions, cancellation sources, owned
//! reactive values. Disposing the scope releases them newest-first, exactly
//! once.

use parking_lot::Mutex;
use std::fmt;

/// Something that holds a resource until disposed
///
/// Implementations must tolerate repeated calls; only the first one does work.
pub trait Disposable: Send + Sync + 'static {
    /// Release the held resource
    fn dispose(&self);
}

// =============================================================================
// Subscription
// =============================================================================

type DisposeAction = Box<dyn FnOnce() + Send>;

/// Handle returned by every `subscribe` call
///
/// Dropping the handle does not unsubscribe; dispose it explicitly or hand it
/// to a [`ResourceScope`].
#[must_use = "a Subscription stays registered until it is disposed or added to a ResourceScope"]
pub struct Subscription {
    action: Mutex<Option<DisposeAction>>,
}

impl Subscription {
    /// Create a subscription that runs `action` on first disposal
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// A subscription with nothing to release
    pub fn empty() -> Self {
        Self {
            action: Mutex::new(None),
        }
    }

    /// Whether the release action has already run (or never existed)
    pub fn is_disposed(&self) -> bool {
        self.action.lock().is_none()
    }

    /// Move this subscription into `scope`
    pub fn add_to(self, scope: &ResourceScope) -> ScopeKey {
        scope.add(self)
    }
}

impl Disposable for Subscription {
    fn dispose(&self) {
        let action = self.action.lock().take();
        if let Some(action) = action {
            action();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// =============================================================================
// Resource Scope
// =============================================================================

/// Key identifying an entry added to a [`ResourceScope`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeKey(u64);

#[derive(Default)]
struct ScopeState {
    items: Vec<(ScopeKey, Box<dyn Disposable>)>,
    next_key: u64,
    disposed: bool,
}

/// Aggregate disposer with ordered, idempotent teardown
///
/// - items are disposed in reverse order of addition
/// - [`dispose`](ResourceScope::dispose) is terminal and idempotent
/// - adding to a disposed scope disposes the argument immediately
/// - [`clear`](ResourceScope::clear) releases the current items but keeps the
///   scope usable
///
/// The scope is disposed on drop if that has not happened yet.
#[derive(Default)]
pub struct ResourceScope {
    state: Mutex<ScopeState>,
}

impl ResourceScope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a disposable to the scope
    ///
    /// If the scope is already disposed the item is disposed right away and
    /// the returned key refers to nothing.
    pub fn add(&self, item: impl Disposable) -> ScopeKey {
        let mut state = self.state.lock();
        let key = ScopeKey(state.next_key);
        state.next_key += 1;

        if state.disposed {
            drop(state);
            tracing::debug!("Disposing item added to an already disposed scope");
            item.dispose();
            return key;
        }

        state.items.push((key, Box::new(item)));
        key
    }

    /// Add a clone of `item` and return the original
    ///
    /// Convenient for values that are shared handles, such as reactive values:
    ///
    /// ```rust
    /// use app_state::{ReactiveValue, ResourceScope};
    ///
    /// let scope = ResourceScope::new();
    /// let name = scope.track(ReactiveValue::new(String::new()));
    /// name.set("Ada".to_string());
    /// scope.dispose();
    /// assert!(name.is_disposed());
    /// ```
    pub fn track<D: Disposable + Clone>(&self, item: D) -> D {
        self.add(item.clone());
        item
    }

    /// Remove an item without disposing it
    pub fn remove(&self, key: ScopeKey) -> Option<Box<dyn Disposable>> {
        let mut state = self.state.lock();
        let index = state.items.iter().position(|(k, _)| *k == key)?;
        Some(state.items.remove(index).1)
    }

    /// Number of items currently held
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether the scope holds no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`dispose`](ResourceScope::dispose) has run
    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Dispose all held items newest-first and keep accepting new ones
    pub fn clear(&self) {
        let items = std::mem::take(&mut self.state.lock().items);
        dispose_in_reverse(items);
    }

    /// Dispose all held items newest-first and refuse new ones
    pub fn dispose(&self) {
        let items = {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            std::mem::take(&mut state.items)
        };
        dispose_in_reverse(items);
    }
}

// Items are released outside the lock: a disposal may touch the scope again.
fn dispose_in_reverse(items: Vec<(ScopeKey, Box<dyn Disposable>)>) {
    for (_, item) in items.into_iter().rev() {
        item.dispose();
    }
}

impl Disposable for ResourceScope {
    fn dispose(&self) {
        ResourceScope::dispose(self);
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        ResourceScope::dispose(self);
    }
}

impl fmt::Debug for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ResourceScope")
            .field("items", &state.items.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}
