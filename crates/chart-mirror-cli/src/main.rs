//! chart-mirror CLI - mirror upstream Helm chart releases into one repository

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;
mod logging;

use commands::update::ReleasedSource;

#[derive(Parser)]
#[command(name = "chart-mirror")]
#[command(version)]
#[command(about = "Mirror upstream Helm chart releases into one unified chart repository", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// GitHub token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the chart of every source at its configured version into a directory
    Export {
        /// Directory receiving the unpacked charts
        #[arg(long, default_value = "charts")]
        target_dir: PathBuf,
    },

    /// Package every upstream release not yet published to the destination
    ///
    /// Released versions are read from the destination's index.yaml. The
    /// archives are left in the target directory for the chart releaser.
    Update {
        /// Directory receiving the chart archives
        #[arg(long, default_value = "charts")]
        target_dir: PathBuf,

        /// Read released versions from a local index.yaml
        #[arg(long, conflicts_with = "from_tags")]
        index_file: Option<PathBuf>,

        /// Read released versions from the destination's release tags
        #[arg(long)]
        from_tags: bool,
    },

    /// Set every source to its latest upstream release and save the configuration
    FetchLatestVersions {
        /// Show the changes without writing the configuration
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.debug) {
        eprintln!("warning: logging unavailable: {e}");
    }

    let result = match cli.command {
        Commands::Export { target_dir } => {
            commands::export::run(&cli.config, cli.token, &target_dir).await
        }

        Commands::Update {
            target_dir,
            index_file,
            from_tags,
        } => {
            let released_from = match (&index_file, from_tags) {
                (Some(path), _) => ReleasedSource::IndexFile(path),
                (None, true) => ReleasedSource::Tags,
                (None, false) => ReleasedSource::PublishedIndex,
            };
            commands::update::run(&cli.config, cli.token, &target_dir, released_from).await
        }

        Commands::FetchLatestVersions { dry_run } => {
            commands::fetch_latest::run(&cli.config, cli.token, dry_run).await
        }
    };

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
