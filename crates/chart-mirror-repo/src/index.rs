//! Published release index
//!
//! The destination serves a Helm repository `index.yaml`; its entries are the
//! authoritative record of which chart versions were already released.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use chart_mirror_core::{DestinationSpec, parse_tag};

use crate::backend::ReleasedVersions;
use crate::error::{RepoError, Result};
use crate::github::GitHubClient;

/// Helm repository index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseIndex {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// When this index was generated
    #[serde(default = "Utc::now")]
    pub generated: DateTime<Utc>,

    /// Released versions by chart name
    #[serde(default)]
    pub entries: HashMap<String, Vec<IndexEntry>>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl Default for ReleaseIndex {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            generated: Utc::now(),
            entries: HashMap::new(),
        }
    }
}

/// One released chart version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default)]
    pub name: String,

    /// Empty when the entry carries no version
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Download URLs
    #[serde(default)]
    pub urls: Vec<String>,

    /// SHA256 of the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl ReleaseIndex {
    /// Parse index from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RepoError::IndexParseError {
            message: e.to_string(),
        })
    }

    /// Parse index from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let yaml = std::str::from_utf8(bytes).map_err(|e| RepoError::IndexParseError {
            message: format!("Invalid UTF-8: {}", e),
        })?;
        Self::from_yaml(yaml)
    }

    /// Load an index from a local file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RepoError::IndexNotFound {
                location: path.display().to_string(),
            });
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Fetch the index the destination publishes on its index branch
    pub async fn fetch(client: &GitHubClient, destination: &DestinationSpec) -> Result<Self> {
        let url = client.index_url(destination);
        debug!(url = %url, "fetching release index");

        let bytes = client.get_bytes(&url).await.map_err(|e| match e {
            RepoError::NotFound { url } => RepoError::IndexNotFound { location: url },
            other => other,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Get all released entries of a chart
    pub fn get(&self, name: &str) -> Option<&Vec<IndexEntry>> {
        self.entries.get(name)
    }

    /// Parsed versions of a chart
    ///
    /// A leading `v` is ignored. Entries without a version or with a
    /// malformed one are skipped.
    pub fn versions(&self, name: &str) -> Vec<Version> {
        let Some(entries) = self.entries.get(name) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| match parse_tag(&entry.version) {
                Ok(version) => Some(version),
                Err(_) if entry.version.is_empty() => {
                    warn!(chart = name, "skipping index entry without version");
                    None
                }
                Err(e) => {
                    warn!(chart = name, version = %entry.version, error = %e, "skipping malformed index entry");
                    None
                }
            })
            .collect()
    }
}

impl ReleasedVersions for ReleaseIndex {
    fn released(&self, chart: &str) -> Vec<Version> {
        self.versions(chart)
    }
}
