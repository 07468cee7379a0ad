// src/manager/mod.rs

//! Reconciliation of the desired package set with the installed one
//!
//! `PackageManager` is built once per invocation. It bootstraps the registry
//! from the lock record, computes diff plans against a desired list and
//! applies them, persisting the lock record only after a whole plan went
//! through.

mod apply;
mod diff;
mod registry;
mod updates;

pub use apply::apply;
pub use diff::{diff, Operation, PackageDiff};
pub use registry::{Registry, RegistryEntry};
pub use updates::{scan, UpdateScan};

use crate::error::{Error, Result};
use crate::lockfile::Lockfile;
use crate::packages::{
    GitHubHandlerFactory, HandlerFactory, PackageDescription, PackageKind,
};
use crate::repository::GitSource;
use crate::version::find_latest;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// What an export produced besides the copied files
#[derive(Debug, Default)]
pub struct ExportSummary {
    /// Number of exported packages
    pub exported: usize,
    /// Resource URLs that have to be registered in Lovelace by hand
    pub plugin_resources: Vec<String>,
}

/// Owner of the registry, lock record, handler factory and remote source
pub struct PackageManager {
    storage: PathBuf,
    lock: Lockfile,
    registry: Registry,
    factory: Box<dyn HandlerFactory>,
    source: Arc<dyn GitSource>,
}

impl PackageManager {
    /// Open (or create) a storage directory backed by the GitHub handlers
    pub fn open(storage: &Path, source: Arc<dyn GitSource>) -> Result<Self> {
        let factory = Box::new(GitHubHandlerFactory::new(storage, Arc::clone(&source)));
        Self::with_factory(storage, source, factory)
    }

    /// Open a storage directory with a custom handler factory
    pub fn with_factory(
        storage: &Path,
        source: Arc<dyn GitSource>,
        factory: Box<dyn HandlerFactory>,
    ) -> Result<Self> {
        let lock = Lockfile::in_storage(storage);

        let registry = if storage.is_dir() {
            Registry::bootstrap(&lock, factory.as_ref())?
        } else {
            fs::create_dir_all(storage).map_err(|e| {
                Error::IoError(format!(
                    "Failed to create storage {}: {}",
                    storage.display(),
                    e
                ))
            })?;
            info!("Created storage at {}", storage.display());
            Registry::new()
        };
        debug!("Opened storage with {} package(s)", registry.len());

        Ok(Self {
            storage: storage.to_path_buf(),
            lock,
            registry,
            factory,
            source,
        })
    }

    pub fn supported_kinds(&self) -> &'static [PackageKind] {
        &PackageKind::ALL
    }

    pub fn storage(&self) -> &Path {
        &self.storage
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn lockfile(&self) -> &Lockfile {
        &self.lock
    }

    /// Installed packages in identity order
    pub fn descriptions(&self) -> Vec<PackageDescription> {
        self.registry.descriptions()
    }

    /// All upstream tags of a repository
    pub fn versions(&self, full_name: &str) -> Result<Vec<String>> {
        self.source.tags(full_name)
    }

    /// Newest eligible upstream tag of a repository
    pub fn resolve_latest(&self, full_name: &str, stable_only: bool) -> Result<String> {
        let tags = self.source.tags(full_name)?;
        find_latest(&tags, stable_only).map_err(|_| {
            Error::NotFoundError(format!(
                "no {} version of {}",
                if stable_only { "stable" } else { "tagged" },
                full_name
            ))
        })
    }

    /// Diff plan from the installed set to `desired`
    ///
    /// Entries pinned to `latest` are resolved first. Nothing is mutated.
    pub fn plan(
        &self,
        desired: &[PackageDescription],
        stable_only: bool,
    ) -> Result<Vec<PackageDiff>> {
        let mut resolved = Vec::with_capacity(desired.len());
        for description in desired {
            let mut description = description.clone();
            if description.is_latest() {
                description.version = self.resolve_latest(&description.full_name, stable_only)?;
                debug!("Resolved {} to {}", description.full_name, description.version);
            }
            resolved.push(description);
        }
        diff(&resolved, &self.registry)
    }

    /// Apply a plan and persist the new lock record
    pub fn apply(&mut self, plan: &[PackageDiff]) -> Result<()> {
        apply(plan, &mut self.registry, self.factory.as_ref(), &self.lock)
    }

    /// Search for newer versions of installed packages
    pub fn updates(&self, stable_only: bool) -> Result<UpdateScan> {
        scan(&self.registry, stable_only)
    }

    /// Copy every installed package into a Home Assistant config layout
    ///
    /// The target directory is emptied first.
    pub fn export(&self, target: &Path) -> Result<ExportSummary> {
        if target.is_dir() {
            fs::remove_dir_all(target).map_err(|e| {
                Error::IoError(format!("Failed to clear {}: {}", target.display(), e))
            })?;
        }
        fs::create_dir_all(target).map_err(|e| {
            Error::IoError(format!("Failed to create {}: {}", target.display(), e))
        })?;

        let mut kinds = BTreeSet::new();
        let mut summary = ExportSummary::default();
        for entry in self.registry.iter() {
            let description = entry.description();
            if kinds.insert(description.kind) {
                description.kind.pre_export(target)?;
            }
            entry
                .handler()
                .export(target)
                .map_err(|e| Error::handler(&description.full_name, "export", e))?;
            summary.exported += 1;
        }

        for kind in kinds {
            summary.plugin_resources.extend(kind.post_export(target)?);
        }

        info!(
            "Exported {} package(s) to {}",
            summary.exported,
            target.display()
        );
        Ok(summary)
    }
}
