//! Export command - build every source at its configured version

use console::style;
use std::path::Path;
use tracing::warn;

use chart_mirror_engine::DirectoryPublisher;

use crate::commands::{Session, cancel_on_interrupt, finish};
use crate::error::Result;

pub async fn run(config_path: &Path, token: Option<String>, target_dir: &Path) -> Result<()> {
    let session = Session::open(config_path, token)?;
    if !session.client.has_token() {
        warn!("no GitHub token, release notes are fetched under the anonymous rate limit");
    }

    println!(
        "{} Exporting {} source(s) to {}",
        style("→").blue(),
        session.config.sources.len(),
        target_dir.display()
    );

    std::fs::create_dir_all(target_dir)?;
    let publisher = DirectoryPublisher::new(target_dir);
    let report = session
        .reconciler(cancel_on_interrupt())
        .export(&publisher)
        .await;

    finish(&report)
}
