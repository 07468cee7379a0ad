// src/version.rs

//! Version identifiers of upstream tags
//!
//! Tags look like `v1.2.3`, `0.1.9.1` or `1.0.0-beta.1`: an optional `v`,
//! dot-separated numeric components and an optional pre-release suffix.
//! A version without a suffix is stable.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

/// A single pre-release identifier.
///
/// Variant order matters: numeric identifiers sort before alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Identifier {
    Numeric(u64),
    Alpha(String),
}

impl Identifier {
    fn parse(value: &str) -> Self {
        if value.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(number) = value.parse() {
                return Identifier::Numeric(number);
            }
        }
        Identifier::Alpha(value.to_string())
    }
}

/// Parsed, comparable version
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    components: Vec<u64>,
    suffix: Vec<Identifier>,
}

impl Version {
    /// Parse a version identifier such as `v1.2.0-rc.1`
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidVersion(format!("'{}': {}", raw, reason));

        if raw.is_empty() {
            return Err(invalid("version is empty"));
        }
        if raw.contains("..") {
            return Err(invalid("repeated dots"));
        }

        let body = raw.strip_prefix('v').unwrap_or(raw);
        let bytes = body.as_bytes();
        let mut components = Vec::new();
        let mut pos = 0;

        loop {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if start == pos {
                return Err(invalid("expected a numeric component"));
            }
            let value = body[start..pos]
                .parse::<u64>()
                .map_err(|_| invalid("numeric component is too large"))?;
            components.push(value);

            // A dot only continues the numeric part when a digit follows it
            if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
                pos += 1;
            } else {
                break;
            }
        }

        let suffix = Self::parse_suffix(&body[pos..]).map_err(|reason| invalid(reason.as_str()))?;

        Ok(Self {
            original: raw.to_string(),
            components,
            suffix,
        })
    }

    fn parse_suffix(suffix: &str) -> std::result::Result<Vec<Identifier>, String> {
        if suffix.is_empty() {
            return Ok(Vec::new());
        }

        let body = suffix
            .strip_prefix('-')
            .or_else(|| suffix.strip_prefix('.'))
            .unwrap_or(suffix);
        if body.is_empty() {
            return Err(format!("invalid suffix '{}'", suffix));
        }
        if !body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(format!("invalid characters in suffix '{}'", suffix));
        }

        body.split('.')
            .map(|part| {
                if part.is_empty() {
                    Err(format!("empty identifier in suffix '{}'", suffix))
                } else {
                    Ok(Identifier::parse(part))
                }
            })
            .collect()
    }

    /// The identifier exactly as it was parsed
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Numeric components, e.g. `[1, 2, 0]` for `v1.2.0-rc.1`
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Stable versions carry no pre-release suffix
    pub fn is_stable(&self) -> bool {
        self.suffix.is_empty()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let left = self.components.get(i).copied().unwrap_or(0);
            let right = other.components.get(i).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }

        match (self.is_stable(), other.is_stable()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.suffix.cmp(&other.suffix),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// Whether `candidate` is strictly newer than `current`.
///
/// Malformed identifiers are never newer, nor is anything newer than them.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    match (Version::parse(candidate), Version::parse(current)) {
        (Ok(candidate), Ok(current)) => candidate > current,
        _ => false,
    }
}

/// Select the newest tag, optionally restricted to stable versions.
///
/// Malformed tags are skipped. Returns `NotFoundError` when no eligible
/// tag remains.
pub fn find_latest<I, S>(tags: I, stable_only: bool) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut latest: Option<Version> = None;

    for tag in tags {
        let tag = tag.as_ref();
        let version = match Version::parse(tag) {
            Ok(version) => version,
            Err(e) => {
                debug!("Skipping tag: {}", e);
                continue;
            }
        };
        if stable_only && !version.is_stable() {
            continue;
        }
        let replace = match &latest {
            Some(current) => version > *current,
            None => true,
        };
        if replace {
            latest = Some(version);
        }
    }

    latest.map(|v| v.original).ok_or_else(|| {
        Error::NotFoundError(if stable_only {
            "no stable version found".to_string()
        } else {
            "no version found".to_string()
        })
    })
}
