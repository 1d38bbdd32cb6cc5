//! Release tag and chart version helpers
//!
//! Upstream projects tag releases as `v1.70.0` while Helm chart versions are
//! strict SemVer without a prefix.

use semver::Version;

use crate::error::{CoreError, Result};

/// Drop a single leading `v` when it is directly followed by a digit
///
/// `v1.70.0` becomes `1.70.0`; `1.70.0`, `vNext` and `v` are returned unchanged.
pub fn strip_version_prefix(version: &str) -> &str {
    match version.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => version,
    }
}

/// Parse an upstream release tag as a semantic version
pub fn parse_tag(tag: &str) -> Result<Version> {
    Version::parse(strip_version_prefix(tag)).map_err(|e| CoreError::InvalidVersion {
        input: tag.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_version_prefix("v1.70.0"), "1.70.0");
        assert_eq!(strip_version_prefix("1.70.0"), "1.70.0");
        assert_eq!(strip_version_prefix("v1.71.0-rc.1"), "1.71.0-rc.1");
    }

    #[test]
    fn test_strip_prefix_requires_digit() {
        assert_eq!(strip_version_prefix("v"), "v");
        assert_eq!(strip_version_prefix("vNext"), "vNext");
        assert_eq!(strip_version_prefix("vv1.0.0"), "vv1.0.0");
    }

    #[test]
    fn test_strip_prefix_only_once() {
        assert_eq!(strip_version_prefix("2.0.0-v2beta1"), "2.0.0-v2beta1");
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag("v1.2.0").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_tag("1.2.0").unwrap(), Version::new(1, 2, 0));

        let pre = parse_tag("v1.71.0-rc.1").unwrap();
        assert_eq!(pre.pre.as_str(), "rc.1");
    }

    #[test]
    fn test_parse_tag_rejects_non_semver() {
        for tag in ["latest", "v1.2", "release-1.2.0", ""] {
            let err = parse_tag(tag).unwrap_err();
            assert!(matches!(err, CoreError::InvalidVersion { ref input, .. } if input == tag));
        }
    }
}
