// src/packages/plugin.rs

//! Lovelace plugin packages
//!
//! A plugin is a single JavaScript file. It is looked up in the tagged tree
//! first (`dist/` then the repository root) and then among the release
//! assets of the tag.

use crate::error::{Error, Result};
use crate::packages::base::BasePackage;
use crate::packages::traits::PackageHandler;
use crate::packages::PackageDescription;
use crate::repository::GitSource;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Export directory, relative to the Home Assistant config root
pub const PLUGIN_DIR: &str = "www/custom_lovelace";

/// URL prefix Home Assistant serves `www/` under
pub const RESOURCE_PREFIX: &str = "/local/custom_lovelace";

const NAME_PREFIX: &str = "lovelace-";

pub struct PluginPackage {
    base: BasePackage,
}

impl PluginPackage {
    pub fn new(description: &PackageDescription, root: &Path, source: Arc<dyn GitSource>) -> Self {
        Self {
            base: BasePackage::new(description, root, "js", source),
        }
    }

    fn script_names(&self) -> [String; 2] {
        let name = script_name(self.base.short_name());
        [format!("{}.js", name), format!("{}-bundle.js", name)]
    }

    /// Find the script for a version, trying every known location in turn
    fn download(&self, version: &str) -> Result<Vec<u8>> {
        let full_name = self.base.full_name();
        let source = &self.base.source;

        for file in self.script_names() {
            for location in ScriptLocation::ORDER {
                match location.fetch(source.as_ref(), full_name, version, &file) {
                    Ok(content) if !content.is_empty() => {
                        debug!("Found {} of {}@{} in {:?}", file, full_name, version, location);
                        return Ok(content);
                    }
                    Ok(_) => debug!("{} in {:?} is empty", file, location),
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            }
        }

        Err(Error::NotFoundError(format!(
            "plugin script is not found: {}@{}",
            full_name, version
        )))
    }
}

impl PackageHandler for PluginPackage {
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
        let source = self.base.current_path();
        let dest = target
            .join(PLUGIN_DIR)
            .join(format!("{}.js", self.base.short_name()));
        fs::copy(&source, &dest).map_err(|e| {
            Error::IoError(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                dest.display(),
                e
            ))
        })?;
        Ok(())
    }
}

/// Places a plugin script may be published in, in lookup order
#[derive(Debug, Clone, Copy)]
enum ScriptLocation {
    Dist,
    Root,
    Release,
}

impl ScriptLocation {
    const ORDER: [ScriptLocation; 3] = [
        ScriptLocation::Dist,
        ScriptLocation::Root,
        ScriptLocation::Release,
    ];

    fn fetch(
        &self,
        source: &dyn GitSource,
        full_name: &str,
        version: &str,
        file: &str,
    ) -> Result<Vec<u8>> {
        match self {
            ScriptLocation::Dist => source.tree_file(full_name, version, &format!("dist/{}", file)),
            ScriptLocation::Root => source.tree_file(full_name, version, file),
            ScriptLocation::Release => source.release_file(full_name, version, file),
        }
    }
}

/// Script base name for a repository: `lovelace-foo-card` ships `foo-card.js`
fn script_name(repo: &str) -> &str {
    repo.strip_prefix(NAME_PREFIX).unwrap_or(repo)
}

/// Create `www/custom_lovelace/` in the export target
pub fn pre_export(target: &Path) -> Result<()> {
    let dir = target.join(PLUGIN_DIR);
    fs::create_dir_all(&dir)
        .map_err(|e| Error::IoError(format!("Failed to create {}: {}", dir.display(), e)))
}

/// Resource URLs for every exported script, sorted
pub fn resources(target: &Path) -> Result<Vec<String>> {
    let dir: PathBuf = target.join(PLUGIN_DIR);
    let mut names = Vec::new();
    for entry in fs::read_dir(&dir)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {}", dir.display(), e)))?
    {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names
        .into_iter()
        .map(|name| format!("{}/{}", RESOURCE_PREFIX, name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageKind;
    use crate::packages::testing::FakeSource;

    const NAME: &str = "foo/lovelace-bar-card";

    fn description(version: &str) -> PackageDescription {
        PackageDescription::new(NAME, PackageKind::Plugin, version)
    }

    #[test]
    fn test_script_name() {
        assert_eq!(script_name("lovelace-bar-card"), "bar-card");
        assert_eq!(script_name("bar-card"), "bar-card");
    }

    #[test]
    fn test_prefers_dist_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::new());
        source.add_tree_file(NAME, "v1.0.0", "dist/bar-card.js", b"dist");
        source.add_tree_file(NAME, "v1.0.0", "bar-card.js", b"root");

        let mut package = PluginPackage::new(&description("v1.0.0"), dir.path(), source);
        package.initialize().unwrap();

        let stored = dir.path().join("foo-lovelace-bar-card@v1.0.0.js");
        assert_eq!(fs::read(stored).unwrap(), b"dist");
    }

    #[test]
    fn test_falls_back_to_release_asset_and_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::new());
        source.add_tree_file(NAME, "v1.0.0", "dist/bar-card.js", b"");
        source.add_release_file(NAME, "v1.0.0", "bar-card-bundle.js", b"bundle");

        let mut package = PluginPackage::new(&description("v1.0.0"), dir.path(), source);
        package.initialize().unwrap();

        let stored = dir.path().join("foo-lovelace-bar-card@v1.0.0.js");
        assert_eq!(fs::read(stored).unwrap(), b"bundle");
    }

    #[test]
    fn test_missing_script_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::new());
        let mut package = PluginPackage::new(&description("v1.0.0"), dir.path(), source);

        let err = package.initialize().unwrap_err();
        assert!(err.is_not_found());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_export_and_resources() {
        let storage = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::new());
        source.add_tree_file(NAME, "v1.0.0", "bar-card.js", b"card");

        let mut package = PluginPackage::new(&description("v1.0.0"), storage.path(), source);
        package.initialize().unwrap();

        pre_export(target.path()).unwrap();
        package.export(target.path()).unwrap();

        let exported = target.path().join("www/custom_lovelace/lovelace-bar-card.js");
        assert_eq!(fs::read(exported).unwrap(), b"card");
        assert_eq!(
            resources(target.path()).unwrap(),
            vec!["/local/custom_lovelace/lovelace-bar-card.js".to_string()]
        );
    }

    #[test]
    fn test_switch_replaces_payload() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::new());
        source.add_tree_file(NAME, "v1.0.0", "bar-card.js", b"one");
        source.add_tree_file(NAME, "v1.1.0", "bar-card.js", b"two");

        let mut package = PluginPackage::new(&description("v1.0.0"), dir.path(), source);
        package.initialize().unwrap();
        package.switch("v1.1.0").unwrap();

        assert!(!dir.path().join("foo-lovelace-bar-card@v1.0.0.js").exists());
        assert_eq!(
            fs::read(dir.path().join("foo-lovelace-bar-card@v1.1.0.js")).unwrap(),
            b"two"
        );
    }
}
