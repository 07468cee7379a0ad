// src/lockfile.rs

//! Durable record of the last successfully reconciled package set
//!
//! The lock record is a JSON array of package descriptions. It is always
//! rewritten as a whole through a temporary file in the same directory, so a
//! crash leaves either the old or the new record on disk.

use crate::error::{Error, Result};
use crate::packages::base::write_atomic;
use crate::packages::{ensure_unique, PackageDescription};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lock record file name inside the storage directory
pub const DEFAULT_NAME: &str = "_lock.json";

/// File-backed lock record store
#[derive(Debug, Clone)]
pub struct Lockfile {
    path: PathBuf,
}

impl Lockfile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lock record at the default location inside a storage directory
    pub fn in_storage(storage: &Path) -> Self {
        Self::new(storage.join(DEFAULT_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the persisted set; an absent or blank record is an empty set
    pub fn load(&self) -> Result<Vec<PackageDescription>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No lock record at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let descriptions: Vec<PackageDescription> =
            serde_json::from_str(&content).map_err(|e| {
                Error::ParseError(format!(
                    "Malformed lock record {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        ensure_unique(&descriptions)?;
        Ok(descriptions)
    }

    /// Replace the persisted set with `descriptions`
    pub fn dump(&self, descriptions: &[PackageDescription]) -> Result<()> {
        let mut content = serde_json::to_vec_pretty(descriptions)?;
        content.push(b'\n');
        write_atomic(&self.path, &content)?;
        info!(
            "Wrote {} package(s) to {}",
            descriptions.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageKind;
    use tempfile::tempdir;

    #[test]
    fn test_missing_record_is_empty() {
        let dir = tempdir().unwrap();
        let lock = Lockfile::in_storage(dir.path());

        assert!(!lock.exists());
        assert!(lock.load().unwrap().is_empty());
    }

    #[test]
    fn test_blank_record_is_empty() {
        let dir = tempdir().unwrap();
        let lock = Lockfile::in_storage(dir.path());
        fs::write(lock.path(), "  \n").unwrap();

        assert!(lock.exists());
        assert!(lock.load().unwrap().is_empty());
    }

    #[test]
    fn test_dump_overwrites_whole_record() {
        let dir = tempdir().unwrap();
        let lock = Lockfile::in_storage(dir.path());

        let first = vec![
            PackageDescription::new("a/one", PackageKind::Integration, "v1.0.0"),
            PackageDescription::new("a/two", PackageKind::Plugin, "v2.0.0"),
        ];
        lock.dump(&first).unwrap();
        assert_eq!(lock.load().unwrap(), first);

        let second = vec![PackageDescription::new("a/two", PackageKind::Plugin, "v2.1.0")];
        lock.dump(&second).unwrap();
        assert_eq!(lock.load().unwrap(), second);

        // Only the record itself is left behind, no temporary files
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from(DEFAULT_NAME)]);
    }

    #[test]
    fn test_record_format() {
        let dir = tempdir().unwrap();
        let lock = Lockfile::in_storage(dir.path());
        lock.dump(&[PackageDescription::new("a/one", PackageKind::Integration, "v1.0.0")])
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(lock.path()).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"full_name": "a/one", "version": "v1.0.0", "kind": "integrations"}])
        );
    }

    #[test]
    fn test_record_with_escaping_version_is_rejected() {
        let dir = tempdir().unwrap();
        let lock = Lockfile::in_storage(dir.path());
        fs::write(
            lock.path(),
            r#"[{"full_name":"a/one","version":"../../outside","kind":"integrations"}]"#,
        )
        .unwrap();

        assert!(matches!(lock.load(), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_malformed_record() {
        let dir = tempdir().unwrap();
        let lock = Lockfile::in_storage(dir.path());

        fs::write(lock.path(), "{not json").unwrap();
        assert!(matches!(lock.load(), Err(Error::ParseError(_))));

        fs::write(
            lock.path(),
            r#"[{"full_name":"a/one","version":"v1","kind":"themes"}]"#,
        )
        .unwrap();
        assert!(matches!(lock.load(), Err(Error::ParseError(_))));
    }
}
