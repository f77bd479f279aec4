//! Installed package records and the upgrade merge.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One installed package, optionally annotated with a newer version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    /// Newest available version, set only when it differs from `version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            latest_version: None,
        }
    }

    pub fn with_latest(mut self, latest: impl Into<String>) -> Self {
        self.latest_version = Some(latest.into());
        self
    }

    pub fn has_upgrade(&self) -> bool {
        self.latest_version
            .as_deref()
            .is_some_and(|latest| latest != self.version)
    }
}

/// Parse the JSON array printed by `pip list --format json`.
///
/// The outdated listing uses the same shape plus `latest_version` (and
/// `latest_filetype`, which is ignored).
pub fn parse_package_list(json: &str) -> Result<Vec<PackageRecord>> {
    serde_json::from_str(json.trim()).context("Failed to parse package list JSON")
}

/// Annotate `base` with the latest versions found in `upgrades`.
///
/// Records are joined by name. Base order is kept and `upgrades` never
/// contributes a record of its own. A latest version equal to the installed
/// one is not an upgrade and leaves the record untouched.
pub fn merge_with_upgrades(
    base: Vec<PackageRecord>,
    upgrades: &[PackageRecord],
) -> Vec<PackageRecord> {
    let latest: HashMap<&str, &str> = upgrades
        .iter()
        .filter_map(|u| u.latest_version.as_deref().map(|l| (u.name.as_str(), l)))
        .collect();

    if latest.is_empty() {
        return base;
    }

    base.into_iter()
        .map(|record| match latest.get(record.name.as_str()) {
            Some(&l) if l != record.version => record.with_latest(l),
            _ => record,
        })
        .collect()
}
