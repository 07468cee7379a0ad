// src/manifest/location.rs

//! Package location strings as users write them

use crate::error::{Error, Result};
use crate::packages::LATEST;
use reqwest::Url;
use std::fmt;

const GITHUB_HOST: &str = "github.com";

/// Repository and version parsed from a location string
///
/// Accepted forms:
/// - `owner/repo` and `owner/repo@version`
/// - `https://github.com/owner/repo` (also without the scheme)
/// - `https://github.com/owner/repo/releases/tag/version`
///
/// A location without a version resolves to `latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
    pub full_name: String,
    pub version: String,
}

impl PackageLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let location = if raw.starts_with(GITHUB_HOST) {
            parse_url(&format!("https://{}", raw))
        } else if raw.contains("://") {
            parse_url(raw)
        } else {
            parse_name(raw)
        };
        location.ok_or_else(|| Error::ConfigurationError(format!("Wrong location format: '{}'", raw)))
    }
}

impl fmt::Display for PackageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.full_name, self.version)
    }
}

fn parse_url(raw: &str) -> Option<PackageLocation> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "https" | "http") || url.host_str() != Some(GITHUB_HOST) {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [owner, repo] => Some(PackageLocation {
            full_name: format!("{}/{}", owner, repo),
            version: LATEST.to_string(),
        }),
        [owner, repo, "releases", "tag", version] => Some(PackageLocation {
            full_name: format!("{}/{}", owner, repo),
            version: version.to_string(),
        }),
        _ => None,
    }
}

fn parse_name(raw: &str) -> Option<PackageLocation> {
    let (name, version) = match raw.split_once('@') {
        Some((_, "")) => return None,
        Some((name, version)) => (name, version),
        None => (raw, LATEST),
    };

    let (owner, repo) = name.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    if owner.chars().any(char::is_whitespace) || repo.chars().any(char::is_whitespace) {
        return None;
    }

    Some(PackageLocation {
        full_name: name.to_string(),
        version: version.to_string(),
    })
}
