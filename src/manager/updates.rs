// src/manager/updates.rs

//! Update search over the installed packages

use crate::error::Result;
use crate::manager::diff::PackageDiff;
use crate::manager::registry::{Registry, RegistryEntry};
use crate::version::is_newer;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Outcome of an update search
#[derive(Debug, Default)]
pub struct UpdateScan {
    /// Switch diffs towards newer versions, in identity order
    pub updates: Vec<PackageDiff>,
    /// Packages without any eligible upstream version
    pub unresolved: Vec<String>,
}

impl UpdateScan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

enum Lookup {
    Update(PackageDiff),
    Current,
    Unresolved(String),
}

/// Ask every installed package for its latest upstream version.
///
/// Lookups only read remote state, so they run in parallel. A package with
/// no eligible version is reported in `unresolved`; any other failure stops
/// the scan.
pub fn scan(registry: &Registry, stable_only: bool) -> Result<UpdateScan> {
    let entries: Vec<&RegistryEntry> = registry.iter().collect();

    let lookups: Vec<Result<Lookup>> = entries
        .par_iter()
        .map(|entry| lookup(entry, stable_only))
        .collect();

    let mut result = UpdateScan::default();
    for outcome in lookups {
        match outcome? {
            Lookup::Update(diff) => result.updates.push(diff),
            Lookup::Current => {}
            Lookup::Unresolved(name) => result.unresolved.push(name),
        }
    }
    Ok(result)
}

fn lookup(entry: &RegistryEntry, stable_only: bool) -> Result<Lookup> {
    let current = entry.description();
    let latest = match entry.handler().latest_version(stable_only) {
        Ok(latest) => latest,
        Err(e) if e.is_not_found() => {
            warn!("No eligible version for {}: {}", current.full_name, e);
            return Ok(Lookup::Unresolved(current.full_name.clone()));
        }
        Err(e) => return Err(e),
    };

    if is_newer(&latest, &current.version) {
        debug!("{} can be updated to {}", current, latest);
        let mut target = current.clone();
        target.version = latest;
        Ok(Lookup::Update(PackageDiff::switch(
            target,
            current.version.clone(),
        )))
    } else {
        Ok(Lookup::Current)
    }
}
