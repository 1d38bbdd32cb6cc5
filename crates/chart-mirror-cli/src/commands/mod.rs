//! CLI commands

pub mod export;
pub mod fetch_latest;
pub mod update;

use console::style;
use std::path::Path;
use tracing::warn;

use chart_mirror_core::{Configuration, CoreError};
use chart_mirror_engine::{
    CancelFlag, ReconcileReport, Reconciler, RunStatus, SourceOutcome, VersionOutcome,
};
use chart_mirror_repo::{GitHubClient, GitImporter};

use crate::error::{CliError, Result};

/// Configuration plus the clients every command talks through
pub struct Session {
    pub config: Configuration,
    pub client: GitHubClient,
    pub importer: GitImporter,
}

impl Session {
    pub fn open(config_path: &Path, token: Option<String>) -> Result<Self> {
        let config = Configuration::load_from(config_path).map_err(|e| match e {
            CoreError::InvalidConfig { message } => CliError::config(message),
            other => CliError::config(format!("{}: {}", config_path.display(), other)),
        })?;
        let client = GitHubClient::new(&config.settings, token)?;
        let importer = GitImporter::new(&config.settings);

        Ok(Self {
            config,
            client,
            importer,
        })
    }

    pub fn reconciler(&self, cancel: CancelFlag) -> Reconciler<'_> {
        Reconciler::new(&self.config, &self.client, &self.importer, &self.client)
            .with_cancel(cancel)
    }
}

/// Token that the command cannot run without
pub fn require_token(token: Option<String>, command: &str) -> Result<String> {
    token.filter(|t| !t.is_empty()).ok_or_else(|| {
        CliError::config_with_help(
            format!("{command} needs a GitHub token"),
            "set GITHUB_TOKEN or pass --token",
        )
    })
}

/// Cancel flag raised by Ctrl-C
pub fn cancel_on_interrupt() -> CancelFlag {
    let cancel = CancelFlag::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current version");
            handle.cancel();
        }
    });
    cancel
}

/// Print per-version results and turn the run status into a result
pub fn finish(report: &ReconcileReport) -> Result<()> {
    for source in &report.sources {
        match &source.outcome {
            SourceOutcome::Failed(e) => {
                println!("{} {}: {}", style("✗").red(), style(&source.name).bold(), e);
            }
            SourceOutcome::Completed(versions) if versions.is_empty() => {
                println!(
                    "{} {}: up to date",
                    style("✓").green(),
                    style(&source.name).bold()
                );
            }
            SourceOutcome::Completed(versions) => {
                println!("{}", style(&source.name).bold());
                for version in versions {
                    match &version.outcome {
                        VersionOutcome::Published {
                            path,
                            missing_dependencies,
                            ..
                        } if missing_dependencies.is_empty() => {
                            println!(
                                "  {} {} → {}",
                                style("✓").green(),
                                version.tag,
                                path.display()
                            );
                        }
                        VersionOutcome::Published {
                            path,
                            missing_dependencies,
                            ..
                        } => {
                            println!(
                                "  {} {} → {} (without {})",
                                style("⚠").yellow(),
                                version.tag,
                                path.display(),
                                missing_dependencies.join(", ")
                            );
                        }
                        VersionOutcome::Skipped(e) => {
                            println!("  {} {}: {}", style("✗").red(), version.tag, e);
                        }
                    }
                }
            }
        }
    }

    println!();
    println!(
        "{} published, {} skipped",
        style(report.published()).green(),
        style(report.skipped()).yellow()
    );

    match report.status() {
        RunStatus::Success => Ok(()),
        RunStatus::Partial => Err(CliError::Partial {
            skipped: report.skipped(),
            incomplete: report
                .sources
                .iter()
                .flat_map(|s| s.versions())
                .filter(|v| v.is_incomplete())
                .count(),
        }),
        RunStatus::Failed => Err(CliError::SourceFailed {
            sources: report
                .sources
                .iter()
                .filter(|s| s.failed_entirely())
                .map(|s| s.name.clone())
                .collect(),
        }),
        RunStatus::Cancelled => Err(CliError::Cancelled),
    }
}
