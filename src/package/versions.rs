//! Extraction of the available-version catalog from pip's diagnostic output.
//!
//! pip has no stable "list versions" command. Asking it to install
//! `name==` fails, and the failure message enumerates every version the
//! index offers:
//!
//! ```text
//! ERROR: Could not find a version that satisfies the requirement foo== (from versions: 1.0, 1.1)
//! ```
//!
//! This parser is coupled to that message format.

use std::sync::LazyLock;

use regex::Regex;

/// Placeholder pip prints when the index has no versions at all.
const NO_VERSIONS: &str = "none";

static FROM_VERSIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(from versions:([^)]*)\)").expect("version clause pattern is valid")
});

/// Extract the versions listed in a `(from versions: ...)` clause, newest
/// first. Returns an empty list when the clause is absent.
pub fn parse_available_versions(diagnostic: &str) -> Vec<String> {
    let Some(captures) = FROM_VERSIONS.captures(diagnostic) else {
        return Vec::new();
    };

    let mut versions: Vec<String> = captures[1]
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != NO_VERSIONS)
        .map(str::to_string)
        .collect();

    versions.reverse();
    versions
}
