// src/packages/base.rs

//! State and payload handling shared by all package kinds

use crate::error::{Error, Result};
use crate::packages::PackageDescription;
use crate::repository::GitSource;
use crate::version::find_latest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Payload bookkeeping for one package version stored as a single file
pub(crate) struct BasePackage {
    full_name: String,
    version: String,
    root: PathBuf,
    extension: &'static str,
    ready: bool,
    pub(crate) source: Arc<dyn GitSource>,
}

impl BasePackage {
    pub(crate) fn new(
        description: &PackageDescription,
        root: &Path,
        extension: &'static str,
        source: Arc<dyn GitSource>,
    ) -> Self {
        Self {
            full_name: description.full_name.clone(),
            version: description.version.clone(),
            root: root.to_path_buf(),
            extension,
            ready: false,
            source,
        }
    }

    pub(crate) fn full_name(&self) -> &str {
        &self.full_name
    }

    pub(crate) fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn short_name(&self) -> &str {
        crate::packages::short_name(&self.full_name)
    }

    /// `<root>/<owner>-<repo>@<version>.<ext>`
    pub(crate) fn payload_path(&self, version: &str) -> PathBuf {
        self.root.join(format!(
            "{}@{}.{}",
            self.full_name.replace('/', "-"),
            version,
            self.extension
        ))
    }

    pub(crate) fn current_path(&self) -> PathBuf {
        self.payload_path(&self.version)
    }

    /// Checks done before the first download
    pub(crate) fn begin_initialize(&self) -> Result<()> {
        if self.ready {
            return Err(Error::ConfigurationError(format!(
                "{} is already initialized",
                self.full_name
            )));
        }
        if self.version == crate::packages::LATEST {
            return Err(Error::InvalidVersion(format!(
                "version of {} is unknown",
                self.full_name
            )));
        }
        Ok(())
    }

    /// Store the payload of the current version and mark the package ready
    pub(crate) fn finish_initialize(&mut self, content: &[u8]) -> Result<()> {
        let path = self.current_path();
        write_atomic(&path, content)?;
        self.ready = true;
        debug!("Stored {} ({} bytes)", path.display(), content.len());
        Ok(())
    }

    pub(crate) fn load(&mut self) -> Result<()> {
        let path = self.current_path();
        if !path.is_file() {
            return Err(Error::NotFoundError(format!(
                "payload {} is missing",
                path.display()
            )));
        }
        self.ready = true;
        Ok(())
    }

    /// Store the new payload, then drop the old one
    pub(crate) fn replace(&mut self, version: &str, content: &[u8]) -> Result<()> {
        if version == self.version {
            return Ok(());
        }
        let previous = self.current_path();
        write_atomic(&self.payload_path(version), content)?;

        match fs::remove_file(&previous) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Previous payload {} was already gone", previous.display());
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to remove {}: {}",
                    previous.display(),
                    e
                )));
            }
        }

        self.version = version.to_string();
        self.ready = true;
        Ok(())
    }

    pub(crate) fn destroy(&mut self) -> Result<()> {
        let path = self.current_path();
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Payload {} is already absent", path.display());
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to remove {}: {}",
                    path.display(),
                    e
                )));
            }
        }
        self.ready = false;
        Ok(())
    }

    pub(crate) fn latest_version(&self, stable_only: bool) -> Result<String> {
        let tags = self.source.tags(&self.full_name)?;
        find_latest(&tags, stable_only).map_err(|_| {
            Error::NotFoundError(format!(
                "no {} version of {}",
                if stable_only { "stable" } else { "tagged" },
                self.full_name
            ))
        })
    }
}

/// Write through a temporary file in the same directory, then rename
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| Error::IoError(format!("Failed to create directory {}: {}", dir.display(), e)))?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| {
        Error::IoError(format!("Failed to write {}: {}", path.display(), e.error))
    })?;
    Ok(())
}
