// src/report.rs

//! Human-readable output of the CLI
//!
//! Everything here only formats; printing is left to the binary.

use crate::manager::{Operation, PackageDiff};
use crate::packages::{PackageDescription, PackageKind};
use std::collections::BTreeMap;
use std::fmt::Write;

const TOKEN_LINK: &str = "https://github.com/settings/tokens";
const RESOURCES_URL: &str = "https://my.home-assistant.io/redirect/lovelace_resources/";

fn heading(kind: PackageKind) -> String {
    let name = kind.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("{}{}:", first.to_uppercase(), chars.as_str()),
        None => ":".to_string(),
    }
}

fn group_by_kind<'a, T>(
    items: &'a [T],
    kind: impl Fn(&T) -> PackageKind,
) -> BTreeMap<PackageKind, Vec<&'a T>> {
    let mut groups: BTreeMap<PackageKind, Vec<&T>> = BTreeMap::new();
    for item in items {
        groups.entry(kind(item)).or_default().push(item);
    }
    groups
}

fn diff_line(diff: &PackageDiff, full_name: bool) -> String {
    let description = &diff.description;
    let name = if full_name {
        description.full_name.as_str()
    } else {
        description.short_name()
    };
    match diff.operation {
        Operation::Add => format!("+ {}@{}", name, description.version),
        Operation::Switch => format!(
            "* {}@{} → {}",
            name,
            diff.current_version.as_deref().unwrap_or("?"),
            description.version
        ),
        Operation::Delete => format!("- {}@{}", name, description.version),
    }
}

/// Planned changes grouped by kind
pub fn format_diff(plan: &[PackageDiff], full_name: bool) -> String {
    let mut out = String::new();
    for (kind, diffs) in group_by_kind(plan, |diff| diff.description.kind) {
        let _ = writeln!(out, "{}", heading(kind));
        for diff in diffs {
            let _ = writeln!(out, "{}", diff_line(diff, full_name));
        }
    }
    out
}

/// Available updates grouped by kind
pub fn format_updates(updates: &[PackageDiff]) -> String {
    let mut out = String::new();
    for (kind, diffs) in group_by_kind(updates, |diff| diff.description.kind) {
        let _ = writeln!(out, "{}", heading(kind));
        for diff in diffs {
            let _ = writeln!(
                out,
                "  {}@{} ({})",
                diff.description.full_name,
                diff.description.version,
                diff.current_version.as_deref().unwrap_or("?")
            );
        }
    }
    out
}

/// Installed packages grouped by kind
pub fn format_packages(packages: &[PackageDescription]) -> String {
    let mut out = String::new();
    for (kind, group) in group_by_kind(packages, |package| package.kind) {
        let _ = writeln!(out, "{}", heading(kind));
        for package in group {
            let _ = writeln!(out, "  {}", package);
        }
    }
    out
}

pub fn format_versions(full_name: &str, versions: &[String]) -> String {
    let mut out = String::new();
    for version in versions {
        let _ = writeln!(out, "- {}@{}", full_name, version);
    }
    out
}

/// Closing line after a sync
pub fn summary(plan: &[PackageDiff]) -> String {
    if plan.is_empty() {
        return "There's nothing to do here".to_string();
    }

    let count = |operation: Operation| plan.iter().filter(|d| d.operation == operation).count();
    let parts: Vec<String> = [
        ("installed", count(Operation::Add)),
        ("removed", count(Operation::Delete)),
        ("switched", count(Operation::Switch)),
    ]
    .into_iter()
    .filter(|(_, n)| *n > 0)
    .map(|(label, n)| format!("{} {}", label, n))
    .collect();

    format!("Done: {}", parts.join(", "))
}

pub fn latest_notice(packages: &[&str]) -> String {
    let mut out = String::from(
        "No versions are listed for some packages.\nThe latest available version will be retrieved and used.",
    );
    for package in packages {
        let _ = write!(out, "\n  {}", package);
    }
    out
}

pub fn no_token_warning(var: &str) -> String {
    format!(
        "${var} is not defined.\n\
         Open {TOKEN_LINK},\n\
         generate a personal token and set it in the ${var} variable.\n\
         Otherwise you will run into rate limit fairly quickly."
    )
}

pub fn wrong_location_hint() -> &'static str {
    "Package Location can be specified in several formats.\n\
     * Root or tag URL of a repository on GitHub.\n\
     \x20 - https://github.com/mishamyrt/myrt_desk_hass\n\
     \x20 - https://github.com/mishamyrt/myrt_desk_hass/releases/tag/v0.2.4\n\
     * Package name with version separated by the @ symbol\n\
     \x20 - mishamyrt/myrt_desk_hass\n\
     \x20 - mishamyrt/myrt_desk_hass@v0.2.4\n\
     If no version is specified, then latest will be used."
}

/// Lovelace resources the user has to register after an export
pub fn plugin_hint(resources: &[String]) -> String {
    let mut out = String::from(
        "To connect JS plugins, they must be specified on the Lovelace resources.\nMake sure those links are there:",
    );
    for resource in resources {
        let _ = write!(out, "\n* {}", resource);
    }
    let _ = write!(out, "\nResources URL: {}", RESOURCES_URL);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Vec<PackageDiff> {
        vec![
            PackageDiff::add(PackageDescription::new(
                "foo/lovelace-card",
                PackageKind::Plugin,
                "v1.0.0",
            )),
            PackageDiff::switch(
                PackageDescription::new("foo/bar_hass", PackageKind::Integration, "v2.0.0"),
                "v1.0.0",
            ),
            PackageDiff::delete(PackageDescription::new(
                "foo/old_hass",
                PackageKind::Integration,
                "v0.1.0",
            )),
        ]
    }

    #[test]
    fn test_format_diff_groups_by_kind() {
        assert_eq!(
            format_diff(&plan(), false),
            "Integrations:\n* bar_hass@v1.0.0 → v2.0.0\n- old_hass@v0.1.0\nPlugins:\n+ lovelace-card@v1.0.0\n"
        );
        assert!(format_diff(&plan(), true).contains("+ foo/lovelace-card@v1.0.0"));
    }

    #[test]
    fn test_format_updates() {
        let updates = vec![PackageDiff::switch(
            PackageDescription::new("foo/bar_hass", PackageKind::Integration, "v2.0.0"),
            "v1.0.0",
        )];
        assert_eq!(
            format_updates(&updates),
            "Integrations:\n  foo/bar_hass@v2.0.0 (v1.0.0)\n"
        );
    }

    #[test]
    fn test_summary() {
        assert_eq!(summary(&[]), "There's nothing to do here");
        assert_eq!(summary(&plan()), "Done: installed 1, removed 1, switched 1");
        assert_eq!(summary(&plan()[..1]), "Done: installed 1");
    }

    #[test]
    fn test_format_packages_and_versions() {
        let packages = vec![PackageDescription::new("foo/bar", PackageKind::Plugin, "v1")];
        assert_eq!(format_packages(&packages), "Plugins:\n  foo/bar@v1\n");
        assert_eq!(
            format_versions("foo/bar", &["v1".to_string(), "v2".to_string()]),
            "- foo/bar@v1\n- foo/bar@v2\n"
        );
    }

    #[test]
    fn test_plugin_hint_lists_resources() {
        let hint = plugin_hint(&["/local/custom_lovelace/card.js".to_string()]);
        assert!(hint.contains("\n* /local/custom_lovelace/card.js\n"));
        assert!(hint.ends_with(RESOURCES_URL));
    }
}
