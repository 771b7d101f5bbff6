//! tailfs gRPC server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tailfs_core::{Fs, FsConfig, config};
use tailfs_server::TailfsService;

/// Per-request deadline; a stuck backing store must not pin a connection
/// forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "tailfs-server", about = "Serve a tailfs filesystem over gRPC")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:50051")]
    listen: SocketAddr,

    /// Directory holding one flat backing file per regular file.
    #[arg(long)]
    backing_root: PathBuf,

    /// Maximum inode ids issued over the lifetime of this server.
    #[arg(long, default_value_t = config::DEFAULT_MAX_INODES)]
    max_inodes: usize,

    /// Maximum entries in one directory.
    #[arg(long, default_value_t = config::DEFAULT_MAX_CHILDREN)]
    max_children: usize,

    /// Maximum path length in bytes.
    #[arg(long, default_value_t = config::DEFAULT_MAX_PATH)]
    max_path: usize,

    /// Maximum name length in bytes.
    #[arg(long, default_value_t = config::DEFAULT_MAX_NAME)]
    max_name: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let fs_config = FsConfig::new(&args.backing_root)
        .with_max_inodes(args.max_inodes)
        .with_max_children(args.max_children)
        .with_max_path(args.max_path)
        .with_max_name(args.max_name);
    let fs = Arc::new(Fs::new(fs_config).context("initializing filesystem")?);

    info!(listen = %args.listen, backing_root = %args.backing_root.display(), "serving");
    tonic::transport::Server::builder()
        .timeout(REQUEST_TIMEOUT)
        .add_service(TailfsService::new(fs).into_server())
        .serve_with_shutdown(args.listen, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("server failed")?;
    Ok(())
}
