// src/manager/registry.rs

//! In-memory set of installed packages and their handlers

use crate::error::{Error, Result};
use crate::lockfile::Lockfile;
use crate::packages::{HandlerFactory, PackageDescription, PackageHandler};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One installed package
pub struct RegistryEntry {
    description: PackageDescription,
    handler: Box<dyn PackageHandler>,
}

impl RegistryEntry {
    pub fn new(description: PackageDescription, handler: Box<dyn PackageHandler>) -> Self {
        Self {
            description,
            handler,
        }
    }

    pub fn description(&self) -> &PackageDescription {
        &self.description
    }

    pub fn handler(&self) -> &dyn PackageHandler {
        self.handler.as_ref()
    }

    pub fn handler_mut(&mut self) -> &mut dyn PackageHandler {
        self.handler.as_mut()
    }

    /// Record the version the handler switched to
    pub fn set_version(&mut self, version: &str) {
        self.description.version = version.to_string();
    }
}

/// Installed packages keyed by identity
///
/// The registry owns every handler. Iteration is in identity order.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate every package recorded in the lock record
    ///
    /// A payload missing from disk is not fatal: the lock record lags behind
    /// after a partially applied plan. Such entries keep their locked version,
    /// so the next diff switches or removes them.
    pub fn bootstrap(lock: &Lockfile, factory: &dyn HandlerFactory) -> Result<Self> {
        let mut registry = Self::new();
        for description in lock.load()? {
            let mut handler = factory.create(&description);
            match handler.load() {
                Ok(()) => debug!("Loaded {}", description),
                Err(e) if e.is_not_found() => {
                    warn!("{} is locked but not on disk: {}", description, e);
                }
                Err(e) => return Err(Error::handler(&description.full_name, "load", e)),
            }
            registry.insert(description, handler)?;
        }
        Ok(registry)
    }

    pub fn insert(
        &mut self,
        description: PackageDescription,
        handler: Box<dyn PackageHandler>,
    ) -> Result<()> {
        if self.entries.contains_key(&description.full_name) {
            return Err(Error::ConfigurationError(format!(
                "Package {} is already installed",
                description.full_name
            )));
        }
        self.entries.insert(
            description.full_name.clone(),
            RegistryEntry::new(description, handler),
        );
        Ok(())
    }

    pub fn get(&self, full_name: &str) -> Option<&RegistryEntry> {
        self.entries.get(full_name)
    }

    pub fn get_mut(&mut self, full_name: &str) -> Option<&mut RegistryEntry> {
        self.entries.get_mut(full_name)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.entries.contains_key(full_name)
    }

    pub fn remove(&mut self, full_name: &str) -> Option<RegistryEntry> {
        self.entries.remove(full_name)
    }

    /// Current state as a list, in identity order
    pub fn descriptions(&self) -> Vec<PackageDescription> {
        self.entries
            .values()
            .map(|entry| entry.description.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
