//! Client CLI: upload and download files through the coordinator

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use minidfs::common::encode_file_name;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "minidfs")]
#[command(about = "minidfs client")]
struct Cli {
    /// Coordinator base URL
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    coordinator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Upload {
        /// Path of the file to upload
        file: PathBuf,

        /// Name to store it under (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Download a file
    Download {
        /// Stored file name
        name: String,

        /// Output path (defaults to the stored name)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List stored files
    Files,
    /// List datanodes and their liveness
    Nodes,
    /// List chunk → replica mappings
    Chunks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.coordinator.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Upload { file, name } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let name = match name {
                Some(n) => n,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("file has no name; pass --name")?,
            };

            let url = format!("{}/files/{}", base, encode_file_name(&name));
            let resp = client.post(&url).body(data).send().await?;
            if resp.status().is_success() {
                println!("Uploaded '{}'", name);
                println!("{}", resp.text().await?);
            } else {
                bail!("upload failed: {} {}", resp.status(), resp.text().await?);
            }
        }
        Commands::Download { name, output } => {
            let url = format!("{}/files/{}", base, encode_file_name(&name));
            let resp = client.get(&url).send().await?;
            if !resp.status().is_success() {
                bail!("download failed: {} {}", resp.status(), resp.text().await?);
            }
            let data = resp.bytes().await?;

            let out = output.unwrap_or_else(|| PathBuf::from(&name));
            let out = available_path(&out);
            tokio::fs::write(&out, &data).await?;
            println!("Downloaded '{}' ({} bytes) to {}", name, data.len(), out.display());
        }
        Commands::Files => print_json(&client, &format!("{}/files", base)).await?,
        Commands::Nodes => print_json(&client, &format!("{}/nodes", base)).await?,
        Commands::Chunks => print_json(&client, &format!("{}/chunks", base)).await?,
    }

    Ok(())
}

/// Avoid clobbering an existing file: fall back to `name_copy.ext`.
fn available_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(String::new);
    let copy = match path.extension() {
        Some(ext) => format!("{}_copy.{}", stem, ext.to_string_lossy()),
        None => format!("{}_copy", stem),
    };
    path.with_file_name(copy)
}

async fn print_json(client: &reqwest::Client, url: &str) -> anyhow::Result<()> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;
    if !status.is_success() {
        bail!("request failed: {} {}", status, body);
    }
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
