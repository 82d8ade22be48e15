//! modelrepo daemon
//!
//! Builds the configured model repository and serves it over HTTP.

use anyhow::Context;
use clap::Parser;
use modelrepo_api::{create_router, SharedRepository};
use modelrepo_core::{LoggingConfig, RepositoryConfig, RepositoryKind, VersionSpec};
use modelrepo_store::{create_model_repository, RawArtifactLoader};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// modelrepod - serves versioned model artifacts from local disk and a remote object store
#[derive(Parser, Debug)]
#[command(name = "modelrepod")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, env = "MODELREPO_CONFIG")]
    config: Option<PathBuf>,

    /// Local models directory
    #[arg(long, env = "MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Remote bucket holding the models
    #[arg(long, env = "S3_MODELS_BUCKET")]
    bucket: Option<String>,

    /// Region of the S3 bucket
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Deployment namespace of remote keys (e.g., development, production)
    #[arg(long, env = "ENV")]
    environment: Option<String>,

    /// Repository composition (local, remote or caching)
    #[arg(long, env = "MODEL_REPOSITORY_TYPE")]
    repository: Option<RepositoryKind>,

    /// Models to fetch before serving
    #[arg(long, value_delimiter = ',')]
    prefetch: Vec<String>,

    /// Address to bind the API server
    #[arg(long)]
    address: Option<String>,

    /// Port for the REST API server
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

/// Load the configuration file (if any) and apply flag/env overrides on top
fn load_config(args: &Args) -> anyhow::Result<RepositoryConfig> {
    let mut config = match &args.config {
        Some(path) => RepositoryConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RepositoryConfig::default(),
    };

    if let Some(models_dir) = &args.models_dir {
        config.storage.models_path = models_dir.clone();
    }
    if let Some(bucket) = &args.bucket {
        config.remote.bucket = bucket.clone();
    }
    if let Some(region) = &args.region {
        config.remote.region = region.clone();
    }
    if let Some(environment) = &args.environment {
        config.remote.environment = environment.clone();
    }
    if let Some(kind) = args.repository {
        config.repository.kind = kind;
    }
    if !args.prefetch.is_empty() {
        config.repository.prefetch = args.prefetch.clone();
    }
    if let Some(address) = &args.address {
        config.api.address = address.clone();
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &LoggingConfig) {
    let log_level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false);

    let result = if config.format.eq_ignore_ascii_case("json") {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Fetch the latest version of each model so first requests are served locally
async fn prefetch(repository: &SharedRepository, names: &[String]) -> usize {
    let mut fetched = 0;
    for name in names {
        match repository.get_model(name, VersionSpec::Latest).await {
            Ok(model) => {
                info!(name = %name, size = model.len(), "Prefetched model");
                fetched += 1;
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to prefetch model");
            }
        }
    }
    fetched
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(&config.logging);

    info!("Starting modelrepo daemon v{}", env!("CARGO_PKG_VERSION"));

    let repository = create_model_repository(&config, Arc::new(RawArtifactLoader::new()))
        .await
        .context("creating model repository")?;

    if !config.repository.prefetch.is_empty() {
        let fetched = prefetch(&repository, &config.repository.prefetch).await;
        info!(
            fetched = fetched,
            requested = config.repository.prefetch.len(),
            "Prefetch finished"
        );
    }

    let router = create_router(repository);

    let addr: SocketAddr = format!("{}:{}", config.api.address, config.api.port)
        .parse()
        .context("invalid API address")?;

    info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, router).await.context("server error")?;

    Ok(())
}
