// src/packages/mod.rs

//! Package kinds and their handlers
//!
//! Every installed package is driven through the `PackageHandler` trait.
//! The supported kinds form a closed set and each kind maps to exactly one
//! handler type through a `HandlerFactory`.

pub(crate) mod base;
pub mod factory;
pub mod integration;
pub mod plugin;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use factory::GitHubHandlerFactory;
pub use traits::{HandlerFactory, PackageHandler};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Manifest version value meaning "resolve the newest tag"
pub const LATEST: &str = "latest";

/// Kind of package, which decides how it is fetched and exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PackageKind {
    /// Custom component, shipped as the repository tarball
    #[serde(rename = "integrations", alias = "integration")]
    Integration,
    /// Lovelace card, shipped as a single JavaScript file
    #[serde(rename = "plugins", alias = "plugin")]
    Plugin,
}

impl PackageKind {
    pub const ALL: [PackageKind; 2] = [PackageKind::Integration, PackageKind::Plugin];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Integration => "integrations",
            PackageKind::Plugin => "plugins",
        }
    }

    /// Prepare the export directory layout for this kind
    pub fn pre_export(&self, target: &Path) -> Result<()> {
        match self {
            PackageKind::Integration => integration::pre_export(target),
            PackageKind::Plugin => plugin::pre_export(target),
        }
    }

    /// Collect what the user has to wire up by hand after an export
    pub fn post_export(&self, target: &Path) -> Result<Vec<String>> {
        match self {
            PackageKind::Integration => Ok(Vec::new()),
            PackageKind::Plugin => plugin::resources(target),
        }
    }
}

impl FromStr for PackageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "integrations" | "integration" => Ok(PackageKind::Integration),
            "plugins" | "plugin" => Ok(PackageKind::Plugin),
            _ => Err(Error::ConfigurationError(format!(
                "Unsupported package kind: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity, kind and version of a package
///
/// This is both the manifest entry and the lock record entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescription {
    /// GitHub `owner/repo`
    #[serde(alias = "url")]
    pub full_name: String,
    pub version: String,
    pub kind: PackageKind,
}

impl PackageDescription {
    pub fn new(full_name: impl Into<String>, kind: PackageKind, version: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            version: version.into(),
            kind,
        }
    }

    /// Repository name without the owner
    pub fn short_name(&self) -> &str {
        short_name(&self.full_name)
    }

    /// Whether the version still has to be resolved
    pub fn is_latest(&self) -> bool {
        self.version == LATEST
    }
}

impl fmt::Display for PackageDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.full_name, self.version)
    }
}

/// Repository part of an `owner/repo` full name
pub fn short_name(full_name: &str) -> &str {
    full_name
        .rsplit_once('/')
        .map(|(_, name)| name)
        .unwrap_or(full_name)
}

/// Reject lists where an identity appears twice, a field is blank, or a
/// version could escape the storage directory
pub fn ensure_unique(descriptions: &[PackageDescription]) -> Result<()> {
    let mut seen = HashSet::new();
    for description in descriptions {
        if description.full_name.is_empty() {
            return Err(Error::ConfigurationError(
                "Package name must not be empty".to_string(),
            ));
        }
        if description.version.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "Package {} has an empty version",
                description.full_name
            )));
        }
        let version = &description.version;
        if version.contains('/') || version.contains('\\') || version.contains("..") {
            return Err(Error::ConfigurationError(format!(
                "Package {} has an invalid version {}",
                description.full_name, version
            )));
        }
        if !seen.insert(description.full_name.as_str()) {
            return Err(Error::ConfigurationError(format!(
                "Package {} is listed more than once",
                description.full_name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("integrations".parse::<PackageKind>().unwrap(), PackageKind::Integration);
        assert_eq!("integration".parse::<PackageKind>().unwrap(), PackageKind::Integration);
        assert_eq!("plugins".parse::<PackageKind>().unwrap(), PackageKind::Plugin);

        let err = "themes".parse::<PackageKind>().unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn test_description_serialization() {
        let description = PackageDescription::new("foo/bar", PackageKind::Plugin, "v1.0.0");
        let json = serde_json::to_string(&description).unwrap();
        assert_eq!(json, r#"{"full_name":"foo/bar","version":"v1.0.0","kind":"plugins"}"#);

        let legacy: PackageDescription =
            serde_json::from_str(r#"{"url":"foo/bar","version":"v1.0.0","kind":"integration"}"#).unwrap();
        assert_eq!(legacy.full_name, "foo/bar");
        assert_eq!(legacy.kind, PackageKind::Integration);
    }

    #[test]
    fn test_description_rejects_unknown_kind() {
        let result: std::result::Result<PackageDescription, _> =
            serde_json::from_str(r#"{"full_name":"foo/bar","version":"v1","kind":"themes"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("mishamyrt/lovelace-card"), "lovelace-card");
        assert_eq!(short_name("plain"), "plain");
    }

    #[test]
    fn test_ensure_unique() {
        let ok = vec![
            PackageDescription::new("a/one", PackageKind::Integration, "v1"),
            PackageDescription::new("a/two", PackageKind::Plugin, "v1"),
        ];
        assert!(ensure_unique(&ok).is_ok());

        let duplicated = vec![
            PackageDescription::new("a/one", PackageKind::Integration, "v1"),
            PackageDescription::new("a/one", PackageKind::Integration, "v2"),
        ];
        assert!(matches!(
            ensure_unique(&duplicated),
            Err(Error::ConfigurationError(_))
        ));

        let blank = vec![PackageDescription::new("a/one", PackageKind::Plugin, "")];
        assert!(ensure_unique(&blank).is_err());

        for version in ["../x", "v1/../../x", "..", "v1\\x"] {
            let escaping = vec![PackageDescription::new("foo/bar", PackageKind::Integration, version)];
            assert!(
                matches!(ensure_unique(&escaping), Err(Error::ConfigurationError(_))),
                "{} was accepted",
                version
            );
        }
    }
}
