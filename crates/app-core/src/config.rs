//! Shell configuration
//!
//! Everything is loaded from one JSON document; missing fields fall back to
//! their defaults.
//!
//! ```rust
//! use app_core::ShellConfig;
//!
//! let config = ShellConfig::from_json(r#"{ "pin_entry": { "pin_length": 4 } }"#).unwrap();
//! assert_eq!(config.pin_entry.pin_length, 4);
//! assert_eq!(config.pin_entry.max_wrong_attempts, 3);
//! assert_eq!(config.log_filter, "info");
//! ```

use app_ui::{RegistryManifest, TransitionConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;
use crate::views;

/// Behaviour of the parent-panel PIN screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinEntryConfig {
    /// Digits in a PIN
    pub pin_length: usize,
    /// Wrong attempts before a lockout starts
    pub max_wrong_attempts: u32,
    /// Lockout length per consecutive round; the last entry repeats
    pub lockout_durations_secs: Vec<u64>,
}

impl Default for PinEntryConfig {
    fn default() -> Self {
        Self {
            pin_length: 6,
            max_wrong_attempts: 3,
            lockout_durations_secs: vec![30, 120, 300],
        }
    }
}

impl PinEntryConfig {
    /// Lockout length for round `round` (0-based)
    pub fn lockout_duration(&self, round: usize) -> Duration {
        let index = round.min(self.lockout_durations_secs.len().saturating_sub(1));
        Duration::from_secs(self.lockout_durations_secs.get(index).copied().unwrap_or(0))
    }
}

/// Top-level shell configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
    /// Transition timing
    pub transitions: TransitionConfig,
    /// PIN screen behaviour
    pub pin_entry: PinEntryConfig,
    /// Screen and popup registry
    pub registry: RegistryManifest,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            transitions: TransitionConfig::default(),
            pin_entry: PinEntryConfig::default(),
            registry: views::default_manifest(),
        }
    }
}

impl ShellConfig {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
