//! Validation of registry locations and registry contents.
//!
//! [`url`] gates a candidate location before anything touches the disk;
//! [`structure`] certifies a materialized registry tree.

pub mod structure;
pub mod url;

use once_cell::sync::Lazy;
use regex::Regex;

pub use structure::{
    read_index, StructureValidator, INDEX_FILE, MODULES_DIR, MODULE_MANIFEST_FILE,
};
pub use url::{
    candidate_endpoints, derive_registry_name, validate_url_format, UrlKind, UrlValidator,
};

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^([0-9]+)\.([0-9]+)\.([0-9]+)",
        r"(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?",
        r"(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    ))
    .expect("semver pattern is valid")
});

static SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("slug pattern is valid"));

/// `MAJOR.MINOR.PATCH[-prerelease][+build]` with numeric core components.
pub fn is_semantic_version(version: &str) -> bool {
    SEMVER.is_match(version)
}

/// Check a lowercase slug (`[a-z0-9-]`) of `min..=max` characters, returning
/// the reason on failure.
pub fn check_slug(name: &str, min: usize, max: usize) -> std::result::Result<(), String> {
    if !SLUG.is_match(name) {
        return Err("must contain only lowercase letters, numbers, and hyphens".to_string());
    }
    let len = name.chars().count();
    if len < min {
        return Err(format!("must be at least {min} characters long"));
    }
    if len > max {
        return Err(format!("must be {max} characters or less"));
    }
    Ok(())
}
