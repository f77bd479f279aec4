//! Package reference normalization.
//!
//! A reference arrives either as a compact string (`requests` or
//! `requests==2.31.0`) or as separate name and version fields. Both are
//! normalized into a [`PackageSpec`] whose `Display` form is what gets handed
//! to pip.

use std::fmt;
use std::str::FromStr;

use crate::error::InvalidSpecError;

const VERSION_SEPARATOR: &str = "==";

/// A normalized package reference: a non-empty name and an optional exact
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    name: String,
    version: Option<String>,
}

impl PackageSpec {
    /// Build a spec, rejecting an empty name. An empty version counts as
    /// no version.
    pub fn new(
        name: impl Into<String>,
        version: Option<impl Into<String>>,
    ) -> Result<Self, InvalidSpecError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(InvalidSpecError("package name cannot be empty".to_string()));
        }

        let version = version
            .map(|v| v.into().trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self { name, version })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}{}{}", self.name, VERSION_SEPARATOR, v),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for PackageSpec {
    type Err = InvalidSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s).ok_or_else(|| InvalidSpecError(format!("'{}'", s)))
    }
}

/// Raw package reference as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageInput {
    /// Compact form, `name` or `name==version`.
    Text(String),
    /// Separate fields.
    Fields {
        name: String,
        version: Option<String>,
    },
}

impl From<&str> for PackageInput {
    fn from(s: &str) -> Self {
        PackageInput::Text(s.to_string())
    }
}

impl From<String> for PackageInput {
    fn from(s: String) -> Self {
        PackageInput::Text(s)
    }
}

impl From<&String> for PackageInput {
    fn from(s: &String) -> Self {
        PackageInput::Text(s.clone())
    }
}

impl From<(&str, Option<&str>)> for PackageInput {
    fn from((name, version): (&str, Option<&str>)) -> Self {
        PackageInput::Fields {
            name: name.to_string(),
            version: version.map(str::to_string),
        }
    }
}

impl From<&PackageSpec> for PackageInput {
    fn from(spec: &PackageSpec) -> Self {
        PackageInput::Fields {
            name: spec.name.clone(),
            version: spec.version.clone(),
        }
    }
}

impl From<PackageSpec> for PackageInput {
    fn from(spec: PackageSpec) -> Self {
        PackageInput::Fields {
            name: spec.name,
            version: spec.version,
        }
    }
}

/// Normalize a package reference.
///
/// Text is split on the first `==`. Whitespace around the name and the
/// version is trimmed, so `normalize(format!("{n}=={v}"))` gives back `n`
/// and `v` unchanged only when neither has leading or trailing whitespace.
///
/// Returns `None` when the resolved name is empty; callers report that as
/// [`InvalidSpecError`] rather than as an operational failure.
pub fn normalize(input: impl Into<PackageInput>) -> Option<PackageSpec> {
    let (name, version) = match input.into() {
        PackageInput::Text(text) => match text.split_once(VERSION_SEPARATOR) {
            Some((name, version)) => (name.to_string(), Some(version.to_string())),
            None => (text, None),
        },
        PackageInput::Fields { name, version } => (name, version),
    };

    PackageSpec::new(name, version).ok()
}
