//! Application shell for Miyo
//!
//! This crate holds the parent and child screens built on the navigation
//! core in `app_ui`, the service boundaries they consume and the startup
//! wiring that puts them together.
//!
//! # Modules
//!
//! - [`services`] - Authentication, child profile and statistics boundaries
//! - [`statistics`] - Play-time aggregation for the parent panel
//! - [`memory`] - In-memory service implementations
//! - [`context`] - Dependencies handed to screens
//! - [`screens`] - Screen and popup view-models
//! - [`views`] - Headless views and the default registry
//! - [`auth_flow`] - Routing after login or registration
//! - [`config`] - Shell configuration
//! - [`bootstrap`] - Shell startup, shutdown and logging
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use app_core::{MemoryAuthService, MemoryChildProfileService, ParentLoginViewModel, Shell};
//! use app_ui::{MemoryStage, ViewModel};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let shell = Shell::builder(
//!     Arc::new(MemoryStage::new()),
//!     Arc::new(MemoryAuthService::new()),
//!     Arc::new(MemoryChildProfileService::new()),
//! )
//! .build()
//! .unwrap();
//!
//! shell.start().await.unwrap();
//! assert_eq!(
//!     shell.context().nav.current_screen_id(),
//!     Some(ParentLoginViewModel::screen_id())
//! );
//! shell.shutdown();
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth_flow;
pub mod bootstrap;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod screens;
pub mod services;
pub mod statistics;
pub mod views;

#[cfg(test)]
mod test_support;

pub use auth_flow::navigate_after_auth;
pub use bootstrap::{init_logging, Shell, ShellBuilder};
pub use config::{PinEntryConfig, ShellConfig};
pub use context::AppContext;
pub use error::{AppError, Result};
pub use memory::{MemoryAuthService, MemoryChildProfileService, MemoryStatisticsService};
pub use screens::{
    on_pin_success, ChildHomeViewModel, ChildProfileSelectViewModel, ConfirmPopupViewModel,
    CreateChildViewModel, ParentHomeViewModel, ParentLoginViewModel, ParentRegisterViewModel,
    PinEntryViewModel, PinSuccess,
};
pub use services::{
    AuthError, AuthService, ChildProfile, ChildProfileService, NewChild, ProfileError,
    StatisticsService,
};
pub use statistics::{CategorySummary, GameStatistic, StatisticsTab};
pub use views::{default_catalog, default_manifest, ConfirmPopupView, HeadlessView};
