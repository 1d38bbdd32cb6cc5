//! Release reconciliation
//!
//! Sources are processed one after another and so are the versions of a
//! source. Cancellation is honoured between versions only, so a chart tree is
//! never abandoned halfway through normalization.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use chart_mirror_core::{
    CONTROLLER_REGISTRATION, ChartMetadata, ChartNode, Configuration, RELEASE_NOTES_FILE,
    SourceSpec, parse_tag,
};
use chart_mirror_repo::{
    ChartImporter, ManifestFetcher, ReleasedVersions, RepoError, UpstreamReleases,
};

use crate::error::{EngineError, Result};
use crate::publisher::ChartPublisher;
use crate::report::{ReconcileReport, SourceOutcome, SourceReport, VersionOutcome, VersionReport};
use crate::synthesizer::synthesize;
use crate::tracker::trackable;
use crate::transformer::normalize;

/// Cooperative cancellation shared with a signal handler
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A normalized chart tree ready for publishing
#[derive(Debug, Clone)]
pub struct BuiltChart {
    pub chart: ChartNode,

    /// Artifact paths that could not be built
    pub missing_dependencies: Vec<String>,
}

/// Drives tracking, building and publishing for every configured source
pub struct Reconciler<'a> {
    config: &'a Configuration,
    upstream: &'a dyn UpstreamReleases,
    importer: &'a dyn ChartImporter,
    manifests: &'a dyn ManifestFetcher,
    cancel: CancelFlag,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a Configuration,
        upstream: &'a dyn UpstreamReleases,
        importer: &'a dyn ChartImporter,
        manifests: &'a dyn ManifestFetcher,
    ) -> Self {
        Self {
            config,
            upstream,
            importer,
            manifests,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Publish every upstream version missing from `released`
    ///
    /// `released` is a snapshot taken before the run and is not re-read.
    pub async fn reconcile(
        &self,
        released: &dyn ReleasedVersions,
        publisher: &dyn ChartPublisher,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for source in &self.config.sources {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let outcome = match self.reconcile_source(source, released, publisher).await {
                Ok(versions) => SourceOutcome::Completed(versions),
                Err(e) => {
                    warn!(source = %source.name, kind = e.kind().to_code_string(), error = %e, "source failed");
                    SourceOutcome::Failed(e)
                }
            };
            report.sources.push(SourceReport {
                name: source.name.clone(),
                outcome,
            });
        }

        report.cancelled |= self.cancel.is_cancelled();
        report
    }

    async fn reconcile_source(
        &self,
        source: &SourceSpec,
        released: &dyn ReleasedVersions,
        publisher: &dyn ChartPublisher,
    ) -> Result<Vec<VersionReport>> {
        let (owner, repo) = source.owner_and_repo()?;
        let releases = self
            .bounded(
                format!("listing releases of {}", source.repo),
                self.upstream
                    .list_releases(owner, repo, self.config.settings.lookback),
            )
            .await?;

        let tags: Vec<&str> = releases.iter().map(|r| r.tag_name.as_str()).collect();
        let pending = trackable(source, &tags, &released.released(&source.name))?;
        info!(source = %source.name, upstream = tags.len(), pending = pending.len(), "tracked versions");

        let notes: HashMap<&str, String> = releases
            .iter()
            .map(|r| (r.tag_name.as_str(), r.body.clone().unwrap_or_default()))
            .collect();

        let mut reports = Vec::with_capacity(pending.len());
        for tracked in pending {
            if self.cancel.is_cancelled() {
                break;
            }

            let versioned = source.with_version(&tracked.tag);
            let release_notes = notes.get(tracked.tag.as_str()).cloned();
            let outcome = self.produce(&versioned, release_notes, publisher).await;
            reports.push(VersionReport {
                tag: tracked.tag,
                outcome,
            });
        }
        Ok(reports)
    }

    /// Build and publish every source at its configured version
    pub async fn export(&self, publisher: &dyn ChartPublisher) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for source in &self.config.sources {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let release_notes = self.release_notes(source).await;
            let outcome = self.produce(source, release_notes, publisher).await;
            report.sources.push(SourceReport {
                name: source.name.clone(),
                outcome: SourceOutcome::Completed(vec![VersionReport {
                    tag: source.version.clone(),
                    outcome,
                }]),
            });
        }

        report.cancelled |= self.cancel.is_cancelled();
        report
    }

    /// Configuration with every source moved to its latest upstream release
    pub async fn fetch_latest_versions(&self) -> Result<Configuration> {
        let mut updated = self.config.clone();

        for source in &mut updated.sources {
            let latest = {
                let (owner, repo) = source.owner_and_repo()?;
                self.bounded(
                    format!("latest release of {}", source.repo),
                    self.upstream.latest_release(owner, repo),
                )
                .await?
            };
            parse_tag(&latest.tag_name).map_err(|e| EngineError::InvalidTag {
                name: source.name.clone(),
                tag: latest.tag_name.clone(),
                message: e.to_string(),
            })?;

            if latest.tag_name != source.version {
                info!(source = %source.name, from = %source.version, to = %latest.tag_name, "new upstream release");
            }
            source.version = latest.tag_name;
        }

        Ok(updated)
    }

    /// Build the normalized chart tree of `source` at its version
    ///
    /// One artifact path that is a chart directory is imported as the root.
    /// Otherwise every artifact becomes a dependency of a chart named after
    /// the source; artifacts that fail are left out and reported, and the
    /// build fails only when none is left.
    pub async fn build_chart(
        &self,
        source: &SourceSpec,
        release_notes: Option<String>,
    ) -> Result<BuiltChart> {
        let mut missing_dependencies = Vec::new();

        let mut root = match source.artifact_paths.as_slice() {
            [single] if single != CONTROLLER_REGISTRATION => {
                self.bounded(
                    format!("import of {} from {}", single, source.repo),
                    self.importer.import(source, single),
                )
                .await?
            }
            paths => {
                let mut metadata = ChartMetadata::new(&source.name, source.chart_version());
                metadata.description = Some(format!("A helmchart for {}", source.name));
                let mut root = ChartNode::new(metadata);

                for path in paths {
                    match self.build_artifact(source, path).await {
                        Ok(dependency) => root.dependencies.push(dependency),
                        Err(e) => {
                            warn!(source = %source.name, version = %source.version, dependency = %path, error = %e, "skipping dependency");
                            missing_dependencies.push(path.clone());
                        }
                    }
                }

                if root.dependencies.is_empty() {
                    return Err(EngineError::Fetch {
                        message: format!(
                            "none of the {} artifacts of {} {} could be built",
                            paths.len(),
                            source.name,
                            source.version
                        ),
                    });
                }
                root
            }
        };

        root.metadata.name = source.name.clone();
        if let Some(notes) = release_notes {
            root.set_file(RELEASE_NOTES_FILE, notes);
        }
        normalize(&mut root, source)?;

        Ok(BuiltChart {
            chart: root,
            missing_dependencies,
        })
    }

    async fn build_artifact(&self, source: &SourceSpec, path: &str) -> Result<ChartNode> {
        if path == CONTROLLER_REGISTRATION {
            return synthesize(source, &self.config.settings, self.manifests).await;
        }
        self.bounded(
            format!("import of {} from {}", path, source.repo),
            self.importer.import(source, path),
        )
        .await
    }

    async fn produce(
        &self,
        source: &SourceSpec,
        release_notes: Option<String>,
        publisher: &dyn ChartPublisher,
    ) -> VersionOutcome {
        let result = match self.build_chart(source, release_notes).await {
            Ok(built) => publisher
                .publish(&built.chart)
                .map(|published| (published, built.missing_dependencies)),
            Err(e) => Err(e),
        };

        match result {
            Ok((published, missing_dependencies)) => {
                info!(source = %source.name, version = %source.version, path = %published.path.display(), "published");
                VersionOutcome::Published {
                    path: published.path,
                    digest: published.digest,
                    missing_dependencies,
                }
            }
            Err(e) => {
                warn!(source = %source.name, version = %source.version, kind = e.kind().to_code_string(), error = %e, "skipping version");
                VersionOutcome::Skipped(e)
            }
        }
    }

    /// Body of the release cut from `source.version`, `None` when the lookup fails
    async fn release_notes(&self, source: &SourceSpec) -> Option<String> {
        let (owner, repo) = source.owner_and_repo().ok()?;
        let lookup = self
            .bounded(
                format!("release {} of {}", source.version, source.repo),
                self.upstream.release_by_tag(owner, repo, &source.version),
            )
            .await;

        match lookup {
            Ok(release) => Some(release.body.unwrap_or_default()),
            Err(EngineError::Repo(e)) if e.is_not_found() => {
                info!(source = %source.name, version = %source.version, "no upstream release for tag, publishing without release notes");
                None
            }
            Err(e) => {
                warn!(source = %source.name, version = %source.version, error = %e, "publishing without release notes");
                None
            }
        }
    }

    /// Run an external call under the configured deadline
    async fn bounded<T>(
        &self,
        operation: String,
        call: impl Future<Output = chart_mirror_repo::Result<T>>,
    ) -> Result<T> {
        let timeout = self.config.settings.timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RepoError::DeadlineExceeded {
                operation,
                seconds: timeout.as_secs(),
            }
            .into()),
        }
    }
}
