//! tailfs mount binary.
//!
//! Mounts one append-only filesystem instance at the given mountpoint and
//! blocks until it is unmounted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use fuser::MountOption;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tailfs_core::{Fs, FsConfig, config};
use tailfs_fuse::TailFuse;

#[derive(Debug, Parser)]
#[command(name = "tailfs-mount", about = "Mount an append-only tailfs filesystem")]
struct Args {
    /// Where to mount the filesystem.
    mountpoint: PathBuf,

    /// Directory holding one flat backing file per regular file.
    #[arg(long)]
    backing_root: PathBuf,

    /// Maximum inode ids issued over the lifetime of this mount.
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

    /// Allow other users to access the mount.
    #[arg(long)]
    allow_other: bool,

    /// Unmount automatically when the process exits.
    #[arg(long)]
    auto_unmount: bool,
}

fn main() -> anyhow::Result<()> {
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

    let mut options = vec![
        MountOption::FSName("tailfs".to_owned()),
        MountOption::DefaultPermissions,
    ];
    if args.allow_other {
        options.push(MountOption::AllowOther);
    }
    if args.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }

    info!(
        mountpoint = %args.mountpoint.display(),
        backing_root = %args.backing_root.display(),
        "mounting"
    );
    fuser::mount2(TailFuse::new(fs), &args.mountpoint, &options).context("mount failed")?;
    Ok(())
}
