//! Entity versioning utilities
//!
//! Entities carry a semantic version that starts at `1.0.0`. Every accepted
//! mutation bumps the patch component.

use semver::Version;

/// Version assigned to a freshly created entity
pub fn initial() -> Version {
    Version::new(1, 0, 0)
}

/// Return the next patch version
pub fn bump_patch(version: &Version) -> Version {
    Version::new(version.major, version.minor, version.patch + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_bumps_from_initial() {
        let v = bump_patch(&bump_patch(&initial()));
        assert_eq!(v.to_string(), "1.0.2");
    }
}
