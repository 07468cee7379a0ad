// src/packages/traits.rs

//! Common traits for package handlers

use crate::error::Result;
use crate::packages::PackageDescription;
use std::path::Path;

/// Lifecycle of one installed package (implemented per kind)
///
/// Handlers are owned by the registry and never shared. Every call may block
/// on network or filesystem I/O.
pub trait PackageHandler: Send + Sync {
    /// First-time setup: fetch and store the payload for the described version
    fn initialize(&mut self) -> Result<()>;

    /// Rehydrate from an existing on-disk payload
    fn load(&mut self) -> Result<()>;

    /// Replace the installed payload with another upstream version
    fn switch(&mut self, version: &str) -> Result<()>;

    /// Remove the on-disk payload
    fn destroy(&mut self) -> Result<()>;

    /// Newest eligible upstream version
    fn latest_version(&self, stable_only: bool) -> Result<String>;

    /// Copy the runtime payload into a Home Assistant config layout
    fn export(&self, target: &Path) -> Result<()>;
}

/// Builds a handler for a package description
pub trait HandlerFactory {
    fn create(&self, description: &PackageDescription) -> Box<dyn PackageHandler>;
}
