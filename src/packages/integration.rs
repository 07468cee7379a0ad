// src/packages/integration.rs

//! Integration (custom component) packages
//!
//! The payload is the repository tarball of the installed tag. On export
//! everything below its `custom_components/` directory is unpacked.

use crate::error::{Error, Result};
use crate::packages::base::BasePackage;
use crate::packages::traits::PackageHandler;
use crate::packages::PackageDescription;
use crate::repository::GitSource;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tar::Archive;
use tracing::{debug, warn};

/// Directory Home Assistant loads custom integrations from
pub const INTEGRATION_DIR: &str = "custom_components";

pub struct IntegrationPackage {
    base: BasePackage,
}

impl IntegrationPackage {
    pub fn new(description: &PackageDescription, root: &Path, source: Arc<dyn GitSource>) -> Self {
        Self {
            base: BasePackage::new(description, root, "tar.gz", source),
        }
    }

    fn download(&self, version: &str) -> Result<Vec<u8>> {
        self.base.source.tarball(self.base.full_name(), version)
    }
}

impl PackageHandler for IntegrationPackage {
    fn initialize(&mut self) -> Result<()> {
        self.base.begin_initialize()?;
        let content = self.download(self.base.version())?;
        self.base.finish_initialize(&content)
    }

    fn load(&mut self) -> Result<()> {
        self.base.load()
    }

    fn switch(&mut self, version: &str) -> Result<()> {
        let content = self.download(version)?;
        self.base.replace(version, &content)
    }

    fn destroy(&mut self) -> Result<()> {
        self.base.destroy()
    }

    fn latest_version(&self, stable_only: bool) -> Result<String> {
        self.base.latest_version(stable_only)
    }

    fn export(&self, target: &Path) -> Result<()> {
        let path = self.base.current_path();
        let file = File::open(&path)
            .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;
        let mut archive = Archive::new(GzDecoder::new(file));
        let mut unpacked = 0;

        for entry in archive
            .entries()
            .map_err(|e| Error::ParseError(format!("Failed to read {}: {}", path.display(), e)))?
        {
            let mut entry = entry
                .map_err(|e| Error::ParseError(format!("Failed to read archive entry: {}", e)))?;

            let entry_path = entry
                .path()
                .map_err(|e| Error::ParseError(format!("Failed to get entry path: {}", e)))?
                .into_owned();

            let Some(relative) = component_path(&entry_path) else {
                continue;
            };
            let dest = target.join(&relative);

            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                fs::create_dir_all(&dest)?;
                continue;
            }
            if !entry_type.is_file() {
                continue;
            }

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            entry.unpack(&dest).map_err(|e| {
                Error::IoError(format!("Failed to unpack {}: {}", dest.display(), e))
            })?;
            unpacked += 1;
        }

        if unpacked == 0 {
            warn!(
                "{} contains no {} directory",
                self.base.full_name(),
                INTEGRATION_DIR
            );
        }
        debug!("Exported {} file(s) of {}", unpacked, self.base.full_name());
        Ok(())
    }
}

/// Path of a tarball entry relative to the export root.
///
/// Tarballs wrap everything in a top-level directory, so only entries nested
/// below it that pass through `custom_components` are kept. Anything that
/// could escape the target is dropped.
fn component_path(entry_path: &Path) -> Option<PathBuf> {
    let mut names = Vec::new();
    for component in entry_path.components() {
        match component {
            Component::Normal(name) => names.push(name),
            Component::CurDir => {}
            _ => return None,
        }
    }

    let index = names.iter().position(|name| *name == INTEGRATION_DIR)?;
    if index == 0 {
        return None;
    }
    Some(names[index..].iter().collect())
}

/// Create `custom_components/` in the export target
pub fn pre_export(target: &Path) -> Result<()> {
    let dir = target.join(INTEGRATION_DIR);
    fs::create_dir_all(&dir)
        .map_err(|e| Error::IoError(format!("Failed to create {}: {}", dir.display(), e)))
}
