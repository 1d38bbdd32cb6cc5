//! Chart import from upstream git tags
//!
//! Every checkout goes into a fresh temporary directory, so a stale clone of
//! an earlier run can never be read. The most recent checkout is kept so the
//! artifact paths of one version share a single fetch.

use async_trait::async_trait;
use git2::build::CheckoutBuilder;
use git2::{AutotagOption, ErrorCode, FetchOptions, Repository};
use std::path::{Component, Path};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

use chart_mirror_core::{ChartNode, Settings, SourceSpec, load_archive};

use crate::backend::ChartImporter;
use crate::error::{RepoError, Result};

/// Imports chart directories from a tag of the upstream repository
pub struct GitImporter {
    web_url: String,
    timeout: Duration,
    shallow: bool,
    last: Mutex<Option<Checkout>>,
}

struct Checkout {
    repo: String,
    tag: String,
    dir: Arc<TempDir>,
}

impl GitImporter {
    pub fn new(settings: &Settings) -> Self {
        Self {
            web_url: settings.web_url.trim_end_matches('/').to_string(),
            timeout: settings.timeout,
            shallow: true,
            last: Mutex::new(None),
        }
    }

    /// Fetch only the tagged commit (default). The local file transport does
    /// not support shallow fetches.
    pub fn shallow(mut self, shallow: bool) -> Self {
        self.shallow = shallow;
        self
    }

    /// Clone URL of `repo` (owner/name)
    pub fn clone_url(&self, repo: &str) -> String {
        format!("{}/{}", self.web_url, repo)
    }

    fn cached(&self, repo: &str, tag: &str) -> Option<Arc<TempDir>> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.as_ref()
            .filter(|c| c.repo == repo && c.tag == tag)
            .map(|c| Arc::clone(&c.dir))
    }

    async fn checkout(&self, source: &SourceSpec) -> Result<Arc<TempDir>> {
        if let Some(dir) = self.cached(&source.repo, &source.version) {
            debug!(repo = %source.repo, tag = %source.version, "reusing checkout");
            return Ok(dir);
        }

        let url = self.clone_url(&source.repo);
        let repo = source.repo.clone();
        let tag = source.version.clone();
        let shallow = self.shallow;
        info!(repo = %source.repo, tag = %source.version, "checking out upstream tag");

        let task = tokio::task::spawn_blocking(move || fetch_tag(&url, &repo, &tag, shallow));
        let dir = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => Arc::new(result?),
            Ok(Err(e)) => return Err(RepoError::Other(format!("checkout task failed: {}", e))),
            Err(_) => {
                return Err(RepoError::DeadlineExceeded {
                    operation: format!("checkout of {}@{}", source.repo, source.version),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(Checkout {
            repo: source.repo.clone(),
            tag: source.version.clone(),
            dir: Arc::clone(&dir),
        });
        Ok(dir)
    }
}

#[async_trait]
impl ChartImporter for GitImporter {
    async fn import(&self, source: &SourceSpec, subpath: &str) -> Result<ChartNode> {
        let relative = Path::new(subpath);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if subpath.is_empty() || escapes {
            return Err(RepoError::InvalidChartPath {
                repo: source.repo.clone(),
                path: subpath.to_string(),
            });
        }

        let checkout = self.checkout(source).await?;
        let target = checkout.path().join(relative);
        if target.is_dir() {
            return Ok(ChartNode::load_dir(&target)?);
        }
        if target.is_file() && subpath.ends_with(".tgz") {
            return Ok(load_archive(&target)?);
        }

        Err(RepoError::InvalidChartPath {
            repo: source.repo.clone(),
            path: subpath.to_string(),
        })
    }
}

/// Fetch `tag` into a new repository and check it out detached
fn fetch_tag(url: &str, repo_name: &str, tag: &str, shallow: bool) -> Result<TempDir> {
    let dir = tempfile::Builder::new().prefix("chart-mirror-").tempdir()?;
    let repo = Repository::init(dir.path())?;

    {
        let mut remote = repo.remote_anonymous(url)?;
        let mut options = FetchOptions::new();
        options.download_tags(AutotagOption::None);
        if shallow {
            options.depth(1);
        }

        let refspec = format!("+refs/tags/{tag}:refs/tags/{tag}");
        remote
            .fetch(&[refspec.as_str()], Some(&mut options), None)
            .map_err(|e| RepoError::Git {
                message: format!("fetching {} from {}: {}", tag, url, e.message()),
            })?;
    }

    {
        let object = repo
            .revparse_single(&format!("refs/tags/{tag}^{{commit}}"))
            .map_err(|e| match e.code() {
                ErrorCode::NotFound => RepoError::ReleaseNotFound {
                    repo: repo_name.to_string(),
                    tag: tag.to_string(),
                },
                _ => e.into(),
            })?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(&object, Some(&mut checkout))?;
        repo.set_head_detached(object.id())?;
    }

    Ok(dir)
}
