//! Version tracking
//!
//! Decides which upstream releases still have to be mirrored. Versions are
//! compared by semver precedence, so `v1.2.0`, `1.2.0` and `1.2.0+build.7`
//! are all the same release.

use semver::Version;
use std::cmp::Ordering;

use chart_mirror_core::{SourceSpec, parse_tag};

use crate::error::{EngineError, Result};

/// One upstream release still to be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedVersion {
    pub version: Version,

    /// Upstream tag exactly as listed (what gets checked out)
    pub tag: String,
}

/// Upstream versions missing downstream, strictly increasing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSet(Vec<TrackedVersion>);

impl VersionSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackedVersion> {
        self.0.iter()
    }

    /// Parsed versions in order
    pub fn versions(&self) -> Vec<Version> {
        self.0.iter().map(|t| t.version.clone()).collect()
    }
}

impl IntoIterator for VersionSet {
    type Item = TrackedVersion;
    type IntoIter = std::vec::IntoIter<TrackedVersion>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Compute the upstream versions of `source` not yet in `released`
///
/// Every upstream tag must be a semantic version: one malformed tag fails the
/// whole call rather than silently under-releasing. Of several tags naming
/// the same version, the one listed first wins.
pub fn trackable<S: AsRef<str>>(
    source: &SourceSpec,
    upstream_tags: &[S],
    released: &[Version],
) -> Result<VersionSet> {
    let mut parsed = Vec::with_capacity(upstream_tags.len());
    for tag in upstream_tags {
        let tag = tag.as_ref();
        let version = parse_tag(tag).map_err(|e| EngineError::InvalidTag {
            name: source.name.clone(),
            tag: tag.to_string(),
            message: e.to_string(),
        })?;
        parsed.push(TrackedVersion {
            version,
            tag: tag.to_string(),
        });
    }

    // stable: the first listed of equal versions stays in front
    parsed.sort_by(|a, b| a.version.cmp_precedence(&b.version));
    parsed.dedup_by(|later, earlier| later.version.cmp_precedence(&earlier.version) == Ordering::Equal);
    parsed.retain(|tracked| {
        !released
            .iter()
            .any(|r| r.cmp_precedence(&tracked.version) == Ordering::Equal)
    });

    Ok(VersionSet(parsed))
}
