//! Package domain types: references, installed records, version catalogs.

mod record;
mod spec;
mod versions;

pub use record::{PackageRecord, merge_with_upgrades, parse_package_list};
pub use spec::{PackageInput, PackageSpec, normalize};
pub use versions::parse_available_versions;

/// Packages pip itself depends on; removing them breaks the environment.
pub const PROTECTED_PACKAGES: &[&str] = &["pip", "setuptools", "wheel"];

/// Returns true if `name` is one of [`PROTECTED_PACKAGES`].
pub fn is_protected(name: &str) -> bool {
    PROTECTED_PACKAGES
        .iter()
        .any(|protected| protected.eq_ignore_ascii_case(name))
}
