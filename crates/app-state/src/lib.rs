//! Reactive state primitives for the Miyo shell
//!
//! This crate provides the observable building blocks that view-models are
//! made of, and the disposal discipline that tears them down again.
//!
//! # Modules
//!
//! - [`reactive`] - Observable values and read-only views
//! - [`collection`] - Observable lists
//! - [`scope`] - Disposables, subscriptions and aggregate teardown
//! - [`cancel`] - Cancellation handles for supersedable waits
//! - [`tasks`] - Tracked background work

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod collection;
pub mod reactive;
pub mod scope;
pub mod tasks;

mod subscribers;

pub use cancel::{CancelSource, CancelToken};
pub use collection::{CollectionChange, ReactiveCollection};
pub use reactive::{Observable, ReactiveValue, ReadOnlyValue};
pub use scope::{Disposable, ResourceScope, ScopeKey, Subscription};
pub use tasks::BackgroundTasks;
