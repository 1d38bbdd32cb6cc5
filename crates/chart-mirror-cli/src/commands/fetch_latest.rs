//! Fetch-latest-versions command - move sources to their newest release

use console::style;
use std::path::Path;

use crate::commands::{Session, cancel_on_interrupt, require_token};
use crate::error::Result;

pub async fn run(config_path: &Path, token: Option<String>, dry_run: bool) -> Result<()> {
    let token = require_token(token, "fetch-latest-versions")?;
    let session = Session::open(config_path, Some(token))?;

    let updated = session
        .reconciler(cancel_on_interrupt())
        .fetch_latest_versions()
        .await?;

    let mut changed = 0;
    for (before, after) in session.config.sources.iter().zip(&updated.sources) {
        if before.version == after.version {
            println!(
                "  {} {} {}",
                style("=").dim(),
                before.name,
                before.version
            );
        } else {
            changed += 1;
            println!(
                "  {} {} {} → {}",
                style("↑").green(),
                before.name,
                before.version,
                style(&after.version).green()
            );
        }
    }

    if dry_run {
        println!("{} {} source(s) would change", style("→").blue(), changed);
        return Ok(());
    }

    updated.save_to(config_path)?;
    println!(
        "{} Updated {} source(s) in {}",
        style("✓").green(),
        changed,
        config_path.display()
    );
    Ok(())
}
