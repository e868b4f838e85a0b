//! Observable list
//!
//! [`ReactiveCollection`] reports every structural change to its change
//! subscribers and then fires one aggregate notification per operation, so a
//! view can either patch individual rows or simply re-render.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::scope::{Disposable, Subscription};
use crate::subscribers::Subscribers;

/// Structural change to a [`ReactiveCollection`]
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionChange<T> {
    /// Item inserted at `index`
    Added {
        /// Position of the new item
        index: usize,
        /// The inserted item
        item: T,
    },
    /// Item removed from `index`
    Removed {
        /// Former position of the item
        index: usize,
        /// The removed item
        item: T,
    },
    /// Item at `index` replaced
    Replaced {
        /// Position of the replaced item
        index: usize,
        /// Previous item
        old: T,
        /// New item
        new: T,
    },
    /// All items removed
    Cleared,
}

struct Inner<T> {
    items: Mutex<Vec<T>>,
    changes: Subscribers<CollectionChange<T>>,
    changed: Subscribers<()>,
    disposed: AtomicBool,
}

/// Observable vector
pub struct ReactiveCollection<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ReactiveCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ReactiveCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> ReactiveCollection<T> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(Vec::new()),
                changes: Subscribers::new(),
                changed: Subscribers::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.lock().get(index).cloned()
    }

    /// Copy of all items
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.lock().clone()
    }

    /// Append an item
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.inner.items.lock();
            items.push(item.clone());
            items.len() - 1
        };
        self.emit(CollectionChange::Added { index, item });
        self.emit_changed();
    }

    /// Insert an item at `index`
    ///
    /// Returns `false` (and changes nothing) when `index > len`.
    pub fn insert(&self, index: usize, item: T) -> bool {
        {
            let mut items = self.inner.items.lock();
            if index > items.len() {
                return false;
            }
            items.insert(index, item.clone());
        }
        self.emit(CollectionChange::Added { index, item });
        self.emit_changed();
        true
    }

    /// Replace the item at `index`, returning the previous one
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        let old = {
            let mut items = self.inner.items.lock();
            let slot = items.get_mut(index)?;
            std::mem::replace(slot, item.clone())
        };
        self.emit(CollectionChange::Replaced {
            index,
            old: old.clone(),
            new: item,
        });
        self.emit_changed();
        Some(old)
    }

    /// Remove the item at `index`
    pub fn remove_at(&self, index: usize) -> Option<T> {
        let item = {
            let mut items = self.inner.items.lock();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.emit(CollectionChange::Removed {
            index,
            item: item.clone(),
        });
        self.emit_changed();
        Some(item)
    }

    /// Remove the first item equal to `item`
    pub fn remove(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        let index = self.inner.items.lock().iter().position(|x| x == item);
        match index {
            Some(index) => self.remove_at(index).is_some(),
            None => false,
        }
    }

    /// Remove every item
    pub fn clear(&self) {
        self.inner.items.lock().clear();
        self.emit(CollectionChange::Cleared);
        self.emit_changed();
    }

    /// Append several items with a single aggregate notification
    pub fn extend(&self, new_items: impl IntoIterator<Item = T>) {
        for item in new_items {
            let index = {
                let mut items = self.inner.items.lock();
                items.push(item.clone());
                items.len() - 1
            };
            self.emit(CollectionChange::Added { index, item });
        }
        self.emit_changed();
    }

    /// Observe individual structural changes
    pub fn subscribe_changes(
        &self,
        callback: impl Fn(&CollectionChange<T>) + Send + Sync + 'static,
    ) -> Subscription {
        if self.is_disposed() {
            return Subscription::empty();
        }
        let id = self.inner.changes.add(Arc::new(callback));
        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.changes.remove(id);
            }
        })
    }

    /// Observe "something changed", once per operation
    pub fn subscribe_changed(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        if self.is_disposed() {
            return Subscription::empty();
        }
        let id = self.inner.changed.add(Arc::new(move |_: &()| callback()));
        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.changed.remove(id);
            }
        })
    }

    /// Whether the collection has been disposed
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    fn emit(&self, change: CollectionChange<T>) {
        self.inner
            .changes
            .notify("ReactiveCollection", |callback| callback(&change));
    }

    fn emit_changed(&self) {
        self.inner
            .changed
            .notify("ReactiveCollection", |callback| callback(&()));
    }
}

impl<T: Clone + Send + Sync + 'static> Disposable for ReactiveCollection<T> {
    fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
        self.inner.changes.clear();
        self.inner.changed.clear();
        self.inner.items.lock().clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.lock().iter()).finish()
    }
}
