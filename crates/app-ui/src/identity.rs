//! Screen identifiers
//!
//! Every view-model kind maps to one screen identifier. The mapping is a pure
//! function of the kind name each view-model declares:
//!
//! - `ParentLoginViewModel` → `parent-login`
//! - `HomeViewModel` → `home`
//! - `CreateChildViewModel` → `create-child`

use serde::{Deserialize, Serialize};
use std::fmt;

const VIEW_MODEL_SUFFIX: &str = "ViewModel";

/// Identifier of a screen or popup in a registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenId(String);

impl ScreenId {
    /// Wrap an identifier as-is
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier for a view-model kind name
    ///
    /// ```rust
    /// use app_ui::ScreenId;
    ///
    /// assert_eq!(ScreenId::from_kind("ParentLoginViewModel").as_str(), "parent-login");
    /// assert_eq!(ScreenId::from_kind("PinEntry").as_str(), "pin-entry");
    /// ```
    pub fn from_kind(kind_name: &str) -> Self {
        let base = kind_name
            .strip_suffix(VIEW_MODEL_SUFFIX)
            .unwrap_or(kind_name);
        Self(to_kebab_case(base))
    }

    /// The identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScreenId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Insert `-` before every uppercase letter after the first, lowercase all
fn to_kebab_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    for (i, ch) in input.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push('-');
        }
        out.extend(ch.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_examples() {
        assert_eq!(ScreenId::from_kind("ParentLoginViewModel").as_str(), "parent-login");
        assert_eq!(ScreenId::from_kind("HomeViewModel").as_str(), "home");
        assert_eq!(ScreenId::from_kind("CreateChildViewModel").as_str(), "create-child");
    }

    #[test]
    fn test_suffix_only_stripped_at_end() {
        assert_eq!(
            ScreenId::from_kind("ViewModelInspector").as_str(),
            "view-model-inspector"
        );
        assert_eq!(ScreenId::from_kind("ChildProfileSelectModel").as_str(), "child-profile-select-model");
    }

    #[test]
    fn test_every_uppercase_gets_separator() {
        assert_eq!(ScreenId::from_kind("PINEntryViewModel").as_str(), "p-i-n-entry");
    }

    #[test]
    fn test_empty_and_lowercase_names() {
        assert_eq!(ScreenId::from_kind("ViewModel").as_str(), "");
        assert_eq!(ScreenId::from_kind("home").as_str(), "home");
    }

    #[test]
    fn test_serde_transparent() {
        let id = ScreenId::new("parent-home");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"parent-home\"");
        let parsed: ScreenId = serde_json::from_str("\"pin-entry\"").unwrap();
        assert_eq!(parsed.as_str(), "pin-entry");
    }
}
