//! Screen registry
//!
//! Immutable lookup from [`ScreenId`] to a [`ViewFactory`]. Registries are
//! assembled in code through [`ScreenRegistry::builder`], or loaded from a
//! JSON [`RegistryManifest`] whose view names resolve against a
//! [`ViewCatalog`].

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, UiError};
use crate::identity::ScreenId;
use crate::view::Bindable;
use crate::view_model::ViewModel;

type MakeView = dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync;

/// Produces fresh views for one registry entry
#[derive(Clone)]
pub struct ViewFactory {
    binds: &'static str,
    make: Arc<MakeView>,
}

impl ViewFactory {
    /// Factory for views that bind `VM`
    pub fn new<VM, V, F>(make: F) -> Self
    where
        VM: ViewModel,
        V: Bindable<VM>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self {
            binds: VM::KIND,
            make: Arc::new(move || {
                let view: Box<dyn Bindable<VM>> = Box::new(make());
                let erased: Box<dyn Any + Send + Sync> = Box::new(view);
                erased
            }),
        }
    }

    /// View-model kind the produced views bind
    pub fn binds(&self) -> &'static str {
        self.binds
    }

    /// Produce a view and check that it binds `VM`
    pub(crate) fn instantiate<VM: ViewModel>(
        &self,
        screen: &ScreenId,
    ) -> Result<Box<dyn Bindable<VM>>> {
        (self.make)()
            .downcast::<Box<dyn Bindable<VM>>>()
            .map(|view| *view)
            .map_err(|_| UiError::MissingBindingContract {
                screen: screen.clone(),
                expected: VM::KIND,
                actual: self.binds,
            })
    }
}

impl fmt::Debug for ViewFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewFactory")
            .field("binds", &self.binds)
            .finish()
    }
}

/// Immutable identifier → factory table
#[derive(Clone, Default)]
pub struct ScreenRegistry {
    entries: Arc<HashMap<ScreenId, ViewFactory>>,
}

impl ScreenRegistry {
    /// Start assembling a registry
    pub fn builder() -> ScreenRegistryBuilder {
        ScreenRegistryBuilder::default()
    }

    /// Factory registered under `id`
    pub fn get_factory(&self, id: &ScreenId) -> Result<&ViewFactory> {
        self.entries
            .get(id)
            .ok_or_else(|| UiError::ScreenNotFound(id.clone()))
    }

    /// Resolve the screen of `VM` and produce a view for it
    pub(crate) fn instantiate<VM: ViewModel>(
        &self,
        id: &ScreenId,
    ) -> Result<Box<dyn Bindable<VM>>> {
        self.get_factory(id)?.instantiate::<VM>(id)
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &ScreenId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<ScreenId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Build a registry from manifest entries
    pub fn from_entries(entries: &[ManifestEntry], catalog: &ViewCatalog) -> Result<Self> {
        entries
            .iter()
            .try_fold(Self::builder(), |builder, entry| {
                let factory = catalog
                    .get(&entry.view)
                    .ok_or_else(|| UiError::UnknownView(entry.view.clone()))?;
                Ok::<_, UiError>(builder.insert(entry.id.clone(), factory.clone()))
            })?
            .build()
    }
}

impl fmt::Debug for ScreenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

/// Builder for [`ScreenRegistry`]
#[derive(Default)]
pub struct ScreenRegistryBuilder {
    entries: HashMap<ScreenId, ViewFactory>,
    duplicate: Option<ScreenId>,
}

impl ScreenRegistryBuilder {
    /// Register a view for `VM` under its derived screen id
    pub fn register<VM, V, F>(self, make: F) -> Self
    where
        VM: ViewModel,
        V: Bindable<VM>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.insert(VM::screen_id(), ViewFactory::new(make))
    }

    /// Register `factory` under an explicit id
    pub fn insert(mut self, id: ScreenId, factory: ViewFactory) -> Self {
        if self.entries.contains_key(&id) {
            self.duplicate.get_or_insert(id);
        } else {
            self.entries.insert(id, factory);
        }
        self
    }

    /// Finish; fails on the first duplicate id
    pub fn build(self) -> Result<ScreenRegistry> {
        if let Some(id) = self.duplicate {
            return Err(UiError::DuplicateEntry(id));
        }
        Ok(ScreenRegistry {
            entries: Arc::new(self.entries),
        })
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// One `{ id, view }` row of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Screen identifier
    pub id: ScreenId,
    /// Catalog name of the view
    pub view: String,
}

/// Startup configuration of both registries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryManifest {
    /// Full-screen entries
    pub screens: Vec<ManifestEntry>,
    /// Popup entries
    pub popups: Vec<ManifestEntry>,
}

/// Screen and popup registries built from one manifest
#[derive(Debug, Clone)]
pub struct Registries {
    /// Registry for the navigation router
    pub screens: ScreenRegistry,
    /// Registry for the popup router
    pub popups: ScreenRegistry,
}

impl RegistryManifest {
    /// Parse a manifest from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve every entry against `catalog`
    pub fn build(&self, catalog: &ViewCatalog) -> Result<Registries> {
        Ok(Registries {
            screens: ScreenRegistry::from_entries(&self.screens, catalog)?,
            popups: ScreenRegistry::from_entries(&self.popups, catalog)?,
        })
    }
}

/// Named view factories available to manifests
#[derive(Debug, Clone, Default)]
pub struct ViewCatalog {
    factories: HashMap<String, ViewFactory>,
}

impl ViewCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a view for `VM` under `name`
    pub fn with_view<VM, V, F>(mut self, name: impl Into<String>, make: F) -> Self
    where
        VM: ViewModel,
        V: Bindable<VM>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), ViewFactory::new(make));
        self
    }

    /// Factory registered under `name`
    pub fn get(&self, name: &str) -> Option<&ViewFactory> {
        self.factories.get(name)
    }
}
