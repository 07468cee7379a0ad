// src/manager/diff.rs

//! Desired-versus-installed comparison
//!
//! Computing a plan is pure: it reads the registry but never touches a
//! handler or the filesystem.

use crate::error::{Error, Result};
use crate::manager::registry::Registry;
use crate::packages::{ensure_unique, PackageDescription};
use std::collections::HashSet;
use std::fmt;

/// What has to happen to one package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Switch,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Switch => "switch",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a diff plan
///
/// For `Add` and `Switch` the description carries the target version, for
/// `Delete` the installed one. `current_version` is set only for `Switch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDiff {
    pub description: PackageDescription,
    pub operation: Operation,
    pub current_version: Option<String>,
}

impl PackageDiff {
    pub fn add(description: PackageDescription) -> Self {
        Self {
            description,
            operation: Operation::Add,
            current_version: None,
        }
    }

    pub fn switch(description: PackageDescription, current_version: impl Into<String>) -> Self {
        Self {
            description,
            operation: Operation::Switch,
            current_version: Some(current_version.into()),
        }
    }

    pub fn delete(description: PackageDescription) -> Self {
        Self {
            description,
            operation: Operation::Delete,
            current_version: None,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.description.full_name
    }
}

/// Plan that turns the installed set into `desired`
///
/// Desired entries come first in input order, then deletions in identity
/// order.
pub fn diff(desired: &[PackageDescription], installed: &Registry) -> Result<Vec<PackageDiff>> {
    ensure_unique(desired)?;

    let mut plan = Vec::new();
    for wanted in desired {
        let Some(entry) = installed.get(&wanted.full_name) else {
            plan.push(PackageDiff::add(wanted.clone()));
            continue;
        };

        let current = entry.description();
        if current.kind != wanted.kind {
            return Err(Error::ConfigurationError(format!(
                "{} is installed as {} but requested as {}",
                wanted.full_name, current.kind, wanted.kind
            )));
        }
        if current.version != wanted.version {
            plan.push(PackageDiff::switch(wanted.clone(), current.version.clone()));
        }
    }

    let wanted: HashSet<&str> = desired.iter().map(|d| d.full_name.as_str()).collect();
    for entry in installed.iter() {
        let current = entry.description();
        if !wanted.contains(current.full_name.as_str()) {
            plan.push(PackageDiff::delete(current.clone()));
        }
    }

    Ok(plan)
}
