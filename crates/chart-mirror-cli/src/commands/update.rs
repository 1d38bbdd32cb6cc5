//! Update command - package every upstream release missing downstream
//!
//! Archives land in the target directory; releasing them and regenerating
//! the index is done by the chart releaser afterwards.

use console::style;
use std::path::Path;
use tracing::info;

use chart_mirror_engine::ArchivePublisher;
use chart_mirror_repo::{ReleaseIndex, ReleasedVersions, TaggedReleases};

use crate::commands::{Session, cancel_on_interrupt, finish, require_token};
use crate::error::Result;

/// Where the already released versions are read from
pub enum ReleasedSource<'a> {
    /// `index.yaml` served from the destination's index branch
    PublishedIndex,
    /// A local copy of `index.yaml`
    IndexFile(&'a Path),
    /// The destination's `<chart>-<version>` release tags
    Tags,
}

pub async fn run(
    config_path: &Path,
    token: Option<String>,
    target_dir: &Path,
    released_from: ReleasedSource<'_>,
) -> Result<()> {
    let token = require_token(token, "update")?;
    let session = Session::open(config_path, Some(token))?;
    let destination = &session.config.destination;

    let released: Box<dyn ReleasedVersions> = match released_from {
        ReleasedSource::PublishedIndex => {
            Box::new(ReleaseIndex::fetch(&session.client, destination).await?)
        }
        ReleasedSource::IndexFile(path) => Box::new(ReleaseIndex::load_from(path)?),
        ReleasedSource::Tags => Box::new(TaggedReleases::load(&session.client, destination).await?),
    };
    info!(owner = %destination.owner, repo = %destination.repo, "loaded released versions");

    println!(
        "{} Reconciling {} source(s) against {}/{}",
        style("→").blue(),
        session.config.sources.len(),
        destination.owner,
        destination.repo
    );

    std::fs::create_dir_all(target_dir)?;
    let publisher = ArchivePublisher::new(target_dir);
    let report = session
        .reconciler(cancel_on_interrupt())
        .reconcile(released.as_ref(), &publisher)
        .await;

    finish(&report)
}
