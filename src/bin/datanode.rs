//! Datanode binary

use clap::{Parser, Subcommand};
use minidfs::{DatanodeConfig, DatanodeServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minidfs-datanode")]
#[command(about = "minidfs datanode: chunk storage and heartbeats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start datanode server
    Serve {
        /// Node ID
        #[arg(long)]
        id: String,

        /// Bind address for the chunk service
        #[arg(long, default_value = "0.0.0.0:7001")]
        bind: String,

        /// Address the coordinator should use to reach this node;
        /// defaults to the bind address
        #[arg(long)]
        advertise: Option<String>,

        /// Chunk data directory
        #[arg(long, default_value = "./datanode-data")]
        data: PathBuf,

        /// Coordinator heartbeat endpoint (host:port)
        #[arg(long, default_value = "127.0.0.1:6000")]
        coordinator: String,

        /// Heartbeat interval in seconds
        #[arg(long, default_value = "5")]
        heartbeat_interval: u64,
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
            id,
            bind,
            advertise,
            data,
            coordinator,
            heartbeat_interval,
        } => {
            let config = DatanodeConfig {
                node_id: id,
                bind_addr: bind.parse()?,
                advertise_addr: advertise.unwrap_or_else(|| bind.clone()),
                data_dir: data,
                coordinator_addr: coordinator,
                heartbeat_interval_secs: heartbeat_interval,
            };
            DatanodeServer::new(config).serve().await?;
        }
    }

    Ok(())
}
