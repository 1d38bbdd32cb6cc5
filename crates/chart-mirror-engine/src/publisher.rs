//! Handing finished chart trees over for release
//!
//! Publishers only write local artifacts. Creating the GitHub release and
//! regenerating `index.yaml` is left to the chart releaser run afterwards.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

use chart_mirror_core::{CHART_API_VERSION, ChartNode, create_archive};

use crate::error::{EngineError, Result};

/// A chart written by a publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedChart {
    pub name: String,
    pub version: String,

    /// Chart directory or archive file
    pub path: PathBuf,

    /// SHA256 of the archive, when one was written
    pub digest: Option<String>,
}

/// Receives finished chart trees
pub trait ChartPublisher: Send + Sync {
    fn publish(&self, chart: &ChartNode) -> Result<PublishedChart>;
}

/// Writes the unpacked chart tree to `<target>/<name>/`
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    target_dir: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}

impl ChartPublisher for DirectoryPublisher {
    fn publish(&self, chart: &ChartNode) -> Result<PublishedChart> {
        check_tree(chart, chart.name())?;

        let dest = self.target_dir.join(chart.name());
        if dest.exists() {
            std::fs::remove_dir_all(&dest).map_err(|e| publish_error(chart, e))?;
        }
        let path = chart.save_dir(&self.target_dir)?;
        info!(chart = chart.name(), version = chart.version(), path = %path.display(), "wrote chart");

        Ok(PublishedChart {
            name: chart.name().to_string(),
            version: chart.version().to_string(),
            path,
            digest: None,
        })
    }
}

/// Packages `<name>-<version>.tgz` into the target directory
#[derive(Debug, Clone)]
pub struct ArchivePublisher {
    target_dir: PathBuf,
}

impl ArchivePublisher {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}

impl ChartPublisher for ArchivePublisher {
    fn publish(&self, chart: &ChartNode) -> Result<PublishedChart> {
        check_tree(chart, chart.name())?;

        let path = create_archive(chart, &self.target_dir)?;
        let data = std::fs::read(&path).map_err(|e| publish_error(chart, e))?;
        let digest = hex::encode(Sha256::digest(&data));
        info!(chart = chart.name(), version = chart.version(), digest = %digest, "packaged chart");

        Ok(PublishedChart {
            name: chart.name().to_string(),
            version: chart.version().to_string(),
            path,
            digest: Some(digest),
        })
    }
}

/// Refuse trees that are not fully normalized
fn check_tree(node: &ChartNode, root: &str) -> Result<()> {
    let invalid = |message: String| EngineError::Publish {
        chart: root.to_string(),
        message,
    };

    if node.name().is_empty() || node.version().is_empty() {
        return Err(invalid("chart without name or version".to_string()));
    }
    if node.metadata.api_version != CHART_API_VERSION {
        return Err(invalid(format!(
            "{} has apiVersion {}",
            node.name(),
            node.metadata.api_version
        )));
    }
    for dependency in &node.dependencies {
        if dependency.version() != node.version() {
            return Err(invalid(format!(
                "{} is at {} but {} is at {}",
                dependency.name(),
                dependency.version(),
                node.name(),
                node.version()
            )));
        }
        if node.metadata.dependency(dependency.name()).is_none() {
            return Err(invalid(format!(
                "{} bundles undeclared dependency {}",
                node.name(),
                dependency.name()
            )));
        }
        check_tree(dependency, root)?;
    }
    Ok(())
}

fn publish_error(chart: &ChartNode, err: std::io::Error) -> EngineError {
    EngineError::Publish {
        chart: chart.name().to_string(),
        message: err.to_string(),
    }
}
