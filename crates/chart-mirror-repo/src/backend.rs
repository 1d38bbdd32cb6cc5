//! Collaborator traits consumed by the reconciliation engine
//!
//! Each trait is the narrow interface to one external system, so the engine
//! can be driven by in-memory fakes in tests.

use async_trait::async_trait;
use chart_mirror_core::{ChartNode, SourceSpec};
use semver::Version;
use serde::Deserialize;

use crate::error::Result;

/// One upstream release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpstreamRelease {
    /// Git tag the release was cut from
    pub tag_name: String,

    /// Release notes (markdown)
    #[serde(default)]
    pub body: Option<String>,

    /// Unpublished draft
    #[serde(default)]
    pub draft: bool,

    /// Marked as pre-release upstream
    #[serde(default)]
    pub prerelease: bool,
}

impl UpstreamRelease {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            body: None,
            draft: false,
            prerelease: false,
        }
    }
}

/// Release listing of a repository
#[async_trait]
pub trait UpstreamReleases: Send + Sync {
    /// List published releases, newest first
    ///
    /// `lookback` caps the number of releases returned; `None` pages until
    /// the listing is exhausted.
    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        lookback: Option<usize>,
    ) -> Result<Vec<UpstreamRelease>>;

    /// Get the release cut from `tag`
    async fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<UpstreamRelease>;

    /// Get the release marked as latest
    async fn latest_release(&self, owner: &str, repo: &str) -> Result<UpstreamRelease>;
}

/// Snapshot of what the destination already published
pub trait ReleasedVersions: Send + Sync {
    /// Versions of `chart` already released downstream
    ///
    /// Unknown charts have no released versions.
    fn released(&self, chart: &str) -> Vec<Version>;
}

/// Plain file download
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Download `url`, `Ok(None)` when it does not exist
    async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>>;
}

/// Imports an upstream chart (directory or packaged `.tgz`) at the source's version
#[async_trait]
pub trait ChartImporter: Send + Sync {
    /// Load the chart found at `subpath` of `source.repo` at tag `source.version`
    async fn import(&self, source: &SourceSpec, subpath: &str) -> Result<ChartNode>;
}
