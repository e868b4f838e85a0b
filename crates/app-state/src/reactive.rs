//! Observable values
//!
//! [`ReactiveValue`] is a mutable cell that notifies subscribers when its
//! value changes. It is a cheap, clonable handle: clones share the same cell.
//! The view-model that declares a value is its only writer; everything else
//! should receive a [`ReadOnlyValue`].
//!
//! # Example
//!
//! ```rust
//! use app_state::{ReactiveValue, ResourceScope};
//! use std::sync::{Arc, Mutex};
//!
//! let count = ReactiveValue::new(0);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let scope = ResourceScope::new();
//! let sink = Arc::clone(&seen);
//! count
//!     .subscribe(move |v| sink.lock().unwrap().push(*v), true)
//!     .add_to(&scope);
//!
//! count.set(1);
//! count.set(1); // equal write, no notification
//! assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::scope::{Disposable, ResourceScope, ScopeKey, Subscription};
use crate::subscribers::Subscribers;

type Comparer<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

struct Cell<T> {
    value: Mutex<T>,
    comparer: Comparer<T>,
    subscribers: Subscribers<T>,
    disposed: AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> Cell<T> {
    fn get(&self) -> T {
        self.value.lock().clone()
    }

    fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(&T) + Send + Sync + 'static,
        invoke_immediately: bool,
    ) -> Subscription {
        if self.disposed.load(Ordering::Acquire) {
            return Subscription::empty();
        }

        let id = self.subscribers.add(Arc::new(callback));

        if invoke_immediately {
            let value = self.get();
            self.subscribers
                .notify_one(std::any::type_name::<T>(), id, |callback| callback(&value));
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(cell) = weak.upgrade() {
                cell.subscribers.remove(id);
            }
        })
    }

    fn notify(&self) {
        self.subscribers.notify(std::any::type_name::<T>(), |callback| {
            // Read at call time: an earlier subscriber may have written again.
            let value = self.get();
            callback(&value);
        });
    }
}

// =============================================================================
// Reactive Value
// =============================================================================

/// Observable mutable cell with change notification
///
/// - a write equal to the current value (per the comparer) never notifies
/// - a differing write notifies every current subscriber exactly once,
///   most recently subscribed first
/// - a panicking subscriber is logged and skipped; the write still lands and
///   the remaining subscribers still run
pub struct ReactiveValue<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Clone for ReactiveValue<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: PartialEq + Clone + Send + Sync + 'static> ReactiveValue<T> {
    /// Create a value compared with `PartialEq`
    pub fn new(initial: T) -> Self {
        Self::with_comparer(initial, |a, b| a == b)
    }
}

impl<T: PartialEq + Clone + Default + Send + Sync + 'static> Default for ReactiveValue<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + 'static> ReactiveValue<T> {
    /// Create a value with a custom equality comparer
    pub fn with_comparer(
        initial: T,
        comparer: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            cell: Arc::new(Cell {
                value: Mutex::new(initial),
                comparer: Box::new(comparer),
                subscribers: Subscribers::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Borrow the current value without cloning it
    ///
    /// The cell is locked while `f` runs; `f` must not write to this value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.value.lock())
    }

    /// Write a value, notifying subscribers if it differs from the current one
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.cell.value.lock();
            if (self.cell.comparer)(&current, &value) {
                return false;
            }
            *current = value;
        }
        self.cell.notify();
        true
    }

    /// Modify the value in place and notify if the result differs
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Write a value without notifying anyone
    pub fn set_without_notify(&self, value: T) {
        *self.cell.value.lock() = value;
    }

    /// Notify all subscribers with the current value regardless of changes
    pub fn force_notify(&self) {
        self.cell.notify();
    }

    /// Register a callback
    ///
    /// With `invoke_immediately` the callback receives the current value
    /// before this call returns. Subscribing to a disposed value does nothing.
    pub fn subscribe(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
        invoke_immediately: bool,
    ) -> Subscription {
        self.cell.subscribe(callback, invoke_immediately)
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.cell.subscribers.len()
    }

    /// Whether the value has been disposed
    pub fn is_disposed(&self) -> bool {
        self.cell.disposed.load(Ordering::Acquire)
    }

    /// Read-only handle sharing this cell
    pub fn read_only(&self) -> ReadOnlyValue<T> {
        ReadOnlyValue {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Disposable for ReactiveValue<T> {
    fn dispose(&self) {
        self.cell.disposed.store(true, Ordering::Release);
        self.cell.subscribers.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveValue")
            .field("value", &*self.cell.value.lock())
            .field("subscribers", &self.cell.subscribers.len())
            .finish()
    }
}

// =============================================================================
// Read-only access
// =============================================================================

/// Read and subscribe access to a [`ReactiveValue`] owned elsewhere
pub struct ReadOnlyValue<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Clone for ReadOnlyValue<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ReadOnlyValue<T> {
    /// Current value
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Borrow the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.value.lock())
    }

    /// Register a callback; see [`ReactiveValue::subscribe`]
    pub fn subscribe(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
        invoke_immediately: bool,
    ) -> Subscription {
        self.cell.subscribe(callback, invoke_immediately)
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadOnlyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadOnlyValue")
            .field(&*self.cell.value.lock())
            .finish()
    }
}

// =============================================================================
// Observable
// =============================================================================

/// Anything that can be read and observed
pub trait Observable<T> {
    /// Current value
    fn current(&self) -> T;

    /// Register a callback; see [`ReactiveValue::subscribe`]
    fn observe(
        &self,
        callback: Box<dyn Fn(&T) + Send + Sync>,
        invoke_immediately: bool,
    ) -> Subscription;

    /// Subscribe with immediate invocation and hand the subscription to `scope`
    fn bind(&self, scope: &ResourceScope, callback: impl Fn(&T) + Send + Sync + 'static) -> ScopeKey
    where
        Self: Sized,
    {
        self.observe(Box::new(callback), true).add_to(scope)
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> for ReactiveValue<T> {
    fn current(&self) -> T {
        self.get()
    }

    fn observe(
        &self,
        callback: Box<dyn Fn(&T) + Send + Sync>,
        invoke_immediately: bool,
    ) -> Subscription {
        self.subscribe(callback, invoke_immediately)
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> for ReadOnlyValue<T> {
    fn current(&self) -> T {
        self.get()
    }

    fn observe(
        &self,
        callback: Box<dyn Fn(&T) + Send + Sync>,
        invoke_immediately: bool,
    ) -> Subscription {
        self.subscribe(callback, invoke_immediately)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone + Send + Sync + 'static>(
        value: &ReactiveValue<T>,
        invoke_immediately: bool,
    ) -> (Arc<Mutex<Vec<T>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = value.subscribe(move |v| sink.lock().push(v.clone()), invoke_immediately);
        (seen, sub)
    }

    #[test]
    fn test_subscribe_invokes_immediately() {
        let value = ReactiveValue::new(5);
        let (seen, _sub) = collect(&value, true);
        assert_eq!(*seen.lock(), vec![5]);
    }

    #[test]
    fn test_subscribe_without_immediate_invoke() {
        let value = ReactiveValue::new(5);
        let (seen, _sub) = collect(&value, false);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_equal_write_does_not_notify() {
        let value = ReactiveValue::new("a".to_string());
        let (seen, _sub) = collect(&value, false);

        assert!(!value.set("a".to_string()));
        assert!(seen.lock().is_empty());

        assert!(value.set("b".to_string()));
        assert_eq!(*seen.lock(), vec!["b".to_string()]);
    }

    #[test]
    fn test_notification_order_newest_first() {
        let value = ReactiveValue::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Vec::new();

        for tag in 1..=3 {
            let order = Arc::clone(&order);
            subs.push(value.subscribe(move |_| order.lock().push(tag), false));
        }

        value.set(1);
        assert_eq!(*order.lock(), vec![3, 2, 1]);
    }

    #[test]
    fn test_each_subscriber_notified_exactly_once() {
        let value = ReactiveValue::new(0);
        let (a, _sa) = collect(&value, false);
        let (b, _sb) = collect(&value, false);

        value.set(42);
        assert_eq!(*a.lock(), vec![42]);
        assert_eq!(*b.lock(), vec![42]);
    }

    #[test]
    fn test_custom_comparer() {
        let value = ReactiveValue::with_comparer(1.0_f32, |a, b| (a - b).abs() < 0.01);
        let (seen, _sub) = collect(&value, false);

        value.set(1.001);
        assert!(seen.lock().is_empty());
        value.set(2.0);
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_set_without_notify_and_force_notify() {
        let value = ReactiveValue::new(0);
        let (seen, _sub) = collect(&value, false);

        value.set_without_notify(9);
        assert!(seen.lock().is_empty());
        assert_eq!(value.get(), 9);

        value.force_notify();
        assert_eq!(*seen.lock(), vec![9]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let value = ReactiveValue::new(0);
        let (seen, sub) = collect(&value, false);

        sub.dispose();
        value.set(3);
        assert!(seen.lock().is_empty());
        assert_eq!(value.subscriber_count(), 0);
    }

    #[test]
    fn test_removal_during_round_skips_removed_only() {
        let value = ReactiveValue::new(0);
        let calls = Arc::new(Mutex::new(Vec::new()));

        // Registered first, notified last.
        let oldest_calls = Arc::clone(&calls);
        let oldest = value.subscribe(move |_| oldest_calls.lock().push("oldest"), false);

        let middle_calls = Arc::clone(&calls);
        let middle = Arc::new(value.subscribe(move |_| middle_calls.lock().push("middle"), false));

        // Notified first; removes the middle subscriber.
        let newest_calls = Arc::clone(&calls);
        let victim = Arc::clone(&middle);
        let newest = value.subscribe(
            move |_| {
                newest_calls.lock().push("newest");
                victim.dispose();
            },
            false,
        );

        value.set(1);
        assert_eq!(*calls.lock(), vec!["newest", "oldest"]);

        oldest.dispose();
        newest.dispose();
    }

    #[test]
    fn test_subscriber_added_during_round_waits_for_next() {
        let value = ReactiveValue::new(0);
        let late_calls = Arc::new(Mutex::new(0));
        let late_subs = Arc::new(Mutex::new(Vec::new()));

        let source = value.clone();
        let counter = Arc::clone(&late_calls);
        let holder = Arc::clone(&late_subs);
        let _outer = value.subscribe(
            move |_| {
                let counter = Arc::clone(&counter);
                let sub = source.subscribe(move |_| *counter.lock() += 1, false);
                holder.lock().push(sub);
            },
            false,
        );

        value.set(1);
        assert_eq!(*late_calls.lock(), 0);
        value.set(2);
        assert_eq!(*late_calls.lock(), 1);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let value = ReactiveValue::new(0);
        let (before, _s1) = collect(&value, false);
        let _bad = value.subscribe(|v| if *v > 0 { panic!("observer failure") }, false);
        let (after, _s2) = collect(&value, false);

        assert!(value.set(1));
        assert_eq!(value.get(), 1);
        assert_eq!(*before.lock(), vec![1]);
        assert_eq!(*after.lock(), vec![1]);
    }

    #[test]
    fn test_dispose_clears_and_blocks_subscribers() {
        let value = ReactiveValue::new(0);
        let (seen, _sub) = collect(&value, false);

        value.dispose();
        assert!(value.is_disposed());
        value.set(1);
        assert!(seen.lock().is_empty());

        let (late, _late_sub) = collect(&value, true);
        assert!(late.lock().is_empty());
    }

    #[test]
    fn test_read_only_shares_cell() {
        let value = ReactiveValue::new(1);
        let view = value.read_only();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = view.subscribe(move |v| sink.lock().push(*v), false);

        value.set(2);
        assert_eq!(view.get(), 2);
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_bind_adds_to_scope() {
        let value = ReactiveValue::new(1);
        let scope = ResourceScope::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        value.bind(&scope, move |v| sink.lock().push(*v));
        assert_eq!(scope.len(), 1);

        scope.dispose();
        value.set(2);
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn test_update_in_place() {
        let value = ReactiveValue::new(vec![1]);
        assert!(value.update(|v| v.push(2)));
        assert_eq!(value.get(), vec![1, 2]);
        assert!(!value.update(|_| {}));
    }
}
