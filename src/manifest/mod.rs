// src/manifest/mod.rs

//! The user-edited manifest of desired packages
//!
//! The manifest is a YAML mapping from a package kind to a list of
//! locations:
//!
//! ```yaml
//! integrations:
//!   - mishamyrt/myrt_desk_hass@v0.2.4
//! plugins:
//!   - https://github.com/mishamyrt/lovelace-bar-card
//! ```

mod location;

pub use location::PackageLocation;

use crate::error::{Error, Result};
use crate::packages::base::write_atomic;
use crate::packages::{ensure_unique, PackageDescription, PackageKind};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default manifest file name
pub const DEFAULT_PATH: &str = "hapm.yaml";

type RawManifest = BTreeMap<String, Option<Vec<String>>>;

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    /// Desired packages, grouped by kind in kind order
    pub values: Vec<PackageDescription>,
}

impl Manifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the manifest file
    pub fn load(&mut self) -> Result<()> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::ConfigurationError(format!(
                "Failed to read manifest {}: {}",
                self.path.display(),
                e
            ))
        })?;
        self.values = Self::parse(&content)?;
        debug!(
            "Loaded {} package(s) from {}",
            self.values.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Parse manifest content into descriptions
    pub fn parse(content: &str) -> Result<Vec<PackageDescription>> {
        if content.trim().is_empty() {
            return Err(Error::ConfigurationError("Manifest is empty".to_string()));
        }

        let raw: Option<RawManifest> = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigurationError(format!("Malformed manifest: {}", e)))?;
        let raw = raw.ok_or_else(|| Error::ConfigurationError("Manifest is empty".to_string()))?;

        let mut values = Vec::new();
        for (key, entries) in raw {
            let kind: PackageKind = key.parse()?;
            for entry in entries.unwrap_or_default() {
                let location = PackageLocation::parse(&entry)?;
                values.push(PackageDescription::new(
                    location.full_name,
                    kind,
                    location.version,
                ));
            }
        }

        ensure_unique(&values)?;
        Ok(values)
    }

    /// Packages that still have to be resolved to a concrete version
    pub fn has_latest(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|value| value.is_latest())
            .map(|value| value.full_name.as_str())
            .collect()
    }

    /// Pin a package to a version, adding it when it is not listed yet
    pub fn set(&mut self, full_name: &str, version: &str, kind: Option<PackageKind>) -> Result<()> {
        if let Some(existing) = self
            .values
            .iter_mut()
            .find(|value| value.full_name == full_name)
        {
            existing.version = version.to_string();
            return Ok(());
        }

        let kind = kind.ok_or_else(|| {
            Error::ConfigurationError(format!(
                "Package type of {} is not declared",
                full_name
            ))
        })?;
        self.values
            .push(PackageDescription::new(full_name, kind, version));
        Ok(())
    }

    /// Write an empty manifest listing the given kinds
    pub fn init(&self, kinds: &[PackageKind]) -> Result<()> {
        let template: BTreeMap<&str, Vec<String>> =
            kinds.iter().map(|kind| (kind.as_str(), Vec::new())).collect();
        self.write(&template)
    }

    /// Write the current values back to the manifest file
    pub fn dump(&self) -> Result<()> {
        let mut content: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for value in &self.values {
            let location = if value.is_latest() {
                value.full_name.clone()
            } else {
                value.to_string()
            };
            content.entry(value.kind.as_str()).or_default().push(location);
        }
        self.write(&content)
    }

    fn write(&self, content: &BTreeMap<&str, Vec<String>>) -> Result<()> {
        let yaml = serde_yaml::to_string(content)?;
        write_atomic(&self.path, yaml.as_bytes())
    }
}
