//! Coordinator binary

use clap::{Parser, Subcommand};
use minidfs::{Coordinator, CoordinatorConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minidfs-coord")]
#[command(about = "minidfs coordinator: metadata, placement, failure detection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start coordinator server
    Serve {
        /// Bind address for the HTTP API
        #[arg(long, default_value = "0.0.0.0:5000")]
        bind: String,

        /// Bind address for the heartbeat listener
        #[arg(long, default_value = "0.0.0.0:6000")]
        heartbeat_bind: String,

        /// Metadata document path
        #[arg(long, default_value = "./metadata.json")]
        meta: PathBuf,

        /// Target replicas per chunk
        #[arg(long, default_value = "2")]
        replication: usize,

        /// Replace existing files on re-upload instead of rejecting
        #[arg(long)]
        overwrite: bool,

        /// Optional TOML config file; CLI flags above are ignored when set
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            heartbeat_bind,
            meta,
            replication,
            overwrite,
            config,
        } => {
            let coord_config = match config {
                Some(path) => CoordinatorConfig::load(&path)?,
                None => CoordinatorConfig {
                    bind_addr: bind.parse()?,
                    heartbeat_addr: heartbeat_bind.parse()?,
                    meta_path: meta,
                    replication,
                    overwrite_files: overwrite,
                    ..Default::default()
                },
            };
            Coordinator::new(coord_config).serve().await?;
        }
    }

    Ok(())
}
