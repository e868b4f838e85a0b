//! Shared subscriber bookkeeping for observable primitives
//!
//! Both [`ReactiveValue`](crate::reactive::ReactiveValue) and
//! [`ReactiveCollection`](crate::collection::ReactiveCollection) keep an ordered
//! list of callbacks and notify them newest-first. This module owns that list
//! and the failure isolation around each invocation.

use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Callback stored by a subscriber list
pub(crate) type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct Entry<A: ?Sized> {
    id: u64,
    callback: Callback<A>,
    /// Set on removal so an in-flight round can skip the entry
    removed: Arc<AtomicBool>,
}

impl<A: ?Sized> Clone for Entry<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
            removed: Arc::clone(&self.removed),
        }
    }
}

impl<A: ?Sized> Entry<A> {
    fn retire(&self) {
        self.removed.store(true, Ordering::Release);
    }

    fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

/// Ordered subscriber list keyed by a monotonically increasing id
pub(crate) struct Subscribers<A: ?Sized> {
    entries: Mutex<Vec<Entry<A>>>,
    next_id: AtomicU64,
}

impl<A: ?Sized> Subscribers<A> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback, returning its id
    pub(crate) fn add(&self, callback: Callback<A>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push(Entry {
            id,
            callback,
            removed: Arc::new(AtomicBool::new(false)),
        });
        id
    }

    /// Remove a callback by id; unknown ids are ignored
    pub(crate) fn remove(&self, id: u64) {
        self.entries.lock().retain(|entry| {
            if entry.id == id {
                entry.retire();
                false
            } else {
                true
            }
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub(crate) fn clear(&self) {
        for entry in self.entries.lock().drain(..) {
            entry.retire();
        }
    }

    /// Invoke a single subscriber, if still registered
    pub(crate) fn notify_one(&self, source: &str, id: u64, invoke: impl FnOnce(&Callback<A>)) {
        let callback = self
            .entries
            .lock()
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| Arc::clone(&entry.callback));
        if let Some(callback) = callback {
            invoke_isolated(source, id, || invoke(&callback));
        }
    }

    /// Notify every subscriber registered when the round starts, newest first.
    ///
    /// A subscriber removed by an earlier callback of the same round is skipped.
    /// Subscribers added during the round are not called until the next one.
    /// The lock is released before any callback runs, so callbacks may
    /// subscribe, unsubscribe, or write back into the owning primitive.
    pub(crate) fn notify(&self, source: &str, invoke: impl Fn(&Callback<A>)) {
        let snapshot: Vec<Entry<A>> = self.entries.lock().clone();

        for entry in snapshot.iter().rev() {
            if entry.is_removed() {
                continue;
            }
            invoke_isolated(source, entry.id, || invoke(&entry.callback));
        }
    }
}

/// Run a subscriber callback, logging a panic instead of propagating it
pub(crate) fn invoke_isolated(source: &str, id: u64, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(
            source = source,
            subscriber = id,
            "Subscriber callback failed: {}",
            message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_newest_first() {
        let subs: Subscribers<u32> = Subscribers::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            subs.add(Arc::new(move |_: &u32| order.lock().push(tag)));
        }

        subs.notify("test", |cb| cb(&1));
        assert_eq!(*order.lock(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_remove_unknown_id_is_ignored() {
        let subs: Subscribers<u32> = Subscribers::new();
        let id = subs.add(Arc::new(|_: &u32| {}));
        subs.remove(id + 100);
        assert_eq!(subs.len(), 1);
        subs.remove(id);
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn test_panicking_callback_does_not_stop_round() {
        let subs: Subscribers<u32> = Subscribers::new();
        let hits = Arc::new(Mutex::new(0));

        let first = Arc::clone(&hits);
        subs.add(Arc::new(move |_: &u32| *first.lock() += 1));
        subs.add(Arc::new(|_: &u32| panic!("boom")));

        subs.notify("test", |cb| cb(&7));
        assert_eq!(*hits.lock(), 1);
    }

    #[test]
    fn test_subscriber_removed_mid_round_is_skipped() {
        let subs: Arc<Subscribers<u32>> = Arc::new(Subscribers::new());
        let hits = Arc::new(Mutex::new(Vec::new()));

        let older = {
            let hits = Arc::clone(&hits);
            subs.add(Arc::new(move |_: &u32| hits.lock().push("older")))
        };
        {
            let hits = Arc::clone(&hits);
            let list = Arc::downgrade(&subs);
            subs.add(Arc::new(move |_: &u32| {
                hits.lock().push("newer");
                if let Some(list) = list.upgrade() {
                    list.remove(older);
                }
            }));
        }

        subs.notify("test", |cb| cb(&1));
        assert_eq!(*hits.lock(), vec!["newer"]);
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn test_clear_mid_round_skips_the_rest() {
        let subs: Arc<Subscribers<u32>> = Arc::new(Subscribers::new());
        let hits = Arc::new(Mutex::new(0));

        let counted = Arc::clone(&hits);
        subs.add(Arc::new(move |_: &u32| *counted.lock() += 1));
        let list = Arc::downgrade(&subs);
        subs.add(Arc::new(move |_: &u32| {
            if let Some(list) = list.upgrade() {
                list.clear();
            }
        }));

        subs.notify("test", |cb| cb(&1));
        assert_eq!(*hits.lock(), 0);
        assert_eq!(subs.len(), 0);
    }
}
