//! modelrepo CLI
//!
//! Command-line interface for querying the modelrepo daemon and publishing
//! artifacts to the remote store.

mod commands;

use clap::{Parser, Subcommand};
use modelrepo_core::{VersionSpec, VersionTag};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// modelrepo - versioned model artifact repository
#[derive(Parser, Debug)]
#[command(name = "modelrepo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Daemon API address
    #[arg(long, default_value = "http://localhost:8000", global = true)]
    api: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the versions of a model
    Versions {
        /// Model name
        name: String,
    },

    /// Check whether a model version is available
    Has {
        /// Model name
        name: String,

        /// Version (e.g., v3 or latest)
        #[arg(default_value = "latest")]
        version: VersionSpec,
    },

    /// Load a model through the daemon
    Load {
        /// Model name
        name: String,

        /// Version (e.g., v3 or latest)
        #[arg(default_value = "latest")]
        version: VersionSpec,
    },

    /// Show daemon status
    Status,

    /// Upload an artifact file to the remote store
    Publish {
        /// Configuration file describing the remote store
        #[arg(long, env = "MODELREPO_CONFIG")]
        config: Option<PathBuf>,

        /// Model name
        name: String,

        /// Version to publish under (e.g., v4)
        version: VersionTag,

        /// Artifact file to upload
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let client = commands::ApiClient::new(&cli.api);

    match cli.command {
        Commands::Versions { name } => {
            commands::versions(&client, name).await?;
        }
        Commands::Has { name, version } => {
            commands::has(&client, name, version).await?;
        }
        Commands::Load { name, version } => {
            commands::load(&client, name, version).await?;
        }
        Commands::Status => {
            commands::status(&client).await?;
        }
        Commands::Publish {
            config,
            name,
            version,
            path,
        } => {
            commands::publish(config, name, version, path).await?;
        }
    }

    Ok(())
}
