//! Outcome of a reconciliation run

use std::path::PathBuf;

use crate::error::EngineError;

/// Overall result, worst outcome wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every version of every source was published
    Success,
    /// Some version or dependency was skipped
    Partial,
    /// At least one source produced nothing
    Failed,
    /// Stopped between two versions
    Cancelled,
}

/// What happened to one version
#[derive(Debug)]
pub enum VersionOutcome {
    Published {
        path: PathBuf,
        digest: Option<String>,
        /// Artifact paths left out of the chart
        missing_dependencies: Vec<String>,
    },
    Skipped(EngineError),
}

#[derive(Debug)]
pub struct VersionReport {
    /// Upstream tag
    pub tag: String,
    pub outcome: VersionOutcome,
}

impl VersionReport {
    pub fn is_published(&self) -> bool {
        matches!(self.outcome, VersionOutcome::Published { .. })
    }

    /// Published, but without every requested dependency
    pub fn is_incomplete(&self) -> bool {
        matches!(
            &self.outcome,
            VersionOutcome::Published { missing_dependencies, .. } if !missing_dependencies.is_empty()
        )
    }
}

/// What happened to one source
#[derive(Debug)]
pub enum SourceOutcome {
    /// Versions were processed (possibly none)
    Completed(Vec<VersionReport>),
    /// Tracking failed before any version was built
    Failed(EngineError),
}

#[derive(Debug)]
pub struct SourceReport {
    pub name: String,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    pub fn versions(&self) -> &[VersionReport] {
        match &self.outcome {
            SourceOutcome::Completed(versions) => versions,
            SourceOutcome::Failed(_) => &[],
        }
    }

    /// Nothing was published although something had to be
    pub fn failed_entirely(&self) -> bool {
        match &self.outcome {
            SourceOutcome::Failed(_) => true,
            SourceOutcome::Completed(versions) => {
                !versions.is_empty() && versions.iter().all(|v| !v.is_published())
            }
        }
    }

    fn degraded(&self) -> bool {
        self.versions()
            .iter()
            .any(|v| !v.is_published() || v.is_incomplete())
    }
}

/// Report of one `update` or `export` run
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub sources: Vec<SourceReport>,
    pub cancelled: bool,
}

impl ReconcileReport {
    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            RunStatus::Cancelled
        } else if self.sources.iter().any(SourceReport::failed_entirely) {
            RunStatus::Failed
        } else if self.sources.iter().any(SourceReport::degraded) {
            RunStatus::Partial
        } else {
            RunStatus::Success
        }
    }

    /// Number of versions published across all sources
    pub fn published(&self) -> usize {
        self.sources
            .iter()
            .flat_map(SourceReport::versions)
            .filter(|v| v.is_published())
            .count()
    }

    /// Number of versions skipped across all sources
    pub fn skipped(&self) -> usize {
        self.sources
            .iter()
            .flat_map(SourceReport::versions)
            .filter(|v| !v.is_published())
            .count()
    }
}
