//! tailfs demo CLI.
//!
//! Exercises every rpc the remote interface offers against a running
//! tailfs-server.

use std::io::Write as _;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tailfs_client::TailClient;
use tailfs_proto::from_unix_seconds;

#[derive(Debug, Parser)]
#[command(name = "tailfs", about = "Talk to a tailfs server")]
struct Args {
    /// Server endpoint.
    #[arg(long, default_value = "http://127.0.0.1:50051")]
    endpoint: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a zero-length file.
    Create {
        /// Parent directory path.
        parent: String,
        /// File name.
        name: String,
        /// Permission bits, octal.
        #[arg(long, default_value = "644", value_parser = parse_octal)]
        mode: u32,
    },
    /// Create a directory.
    Mkdir {
        /// Parent directory path.
        parent: String,
        /// Directory name.
        name: String,
        /// Permission bits, octal.
        #[arg(long, default_value = "755", value_parser = parse_octal)]
        mode: u32,
    },
    /// Append data to a file.
    Write {
        /// File path.
        path: String,
        /// Data to append.
        data: String,
        /// Offset to write at; must be at or past end of file.
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Read bytes from a file to stdout.
    Get {
        /// File path.
        path: String,
        /// Offset to read from.
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Bytes to read; 0 reads to the end.
        #[arg(long, default_value_t = 0)]
        size: u64,
    },
    /// List a directory.
    Ls {
        /// Directory path.
        path: String,
        /// Emit the listing as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn parse_octal(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s, 8).map_err(|e| format!("not an octal mode: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut client = TailClient::connect(args.endpoint)
        .await
        .context("connecting to server")?;

    match args.command {
        Command::Create { parent, name, mode } => {
            client.create(&parent, &name, mode).await?;
            println!("created {}/{name}", parent.trim_end_matches('/'));
        }
        Command::Mkdir { parent, name, mode } => {
            client.mkdir(&parent, &name, mode).await?;
            println!("created {}/{name}", parent.trim_end_matches('/'));
        }
        Command::Write { path, data, offset } => {
            let written = client.write(&path, data.into_bytes(), offset).await?;
            println!("wrote {written} bytes");
        }
        Command::Get { path, offset, size } => {
            let data = client.get(&path, offset, size).await?;
            std::io::stdout().write_all(&data)?;
        }
        Command::Ls { path, json } => {
            let entries = client.read_dir(&path).await?;
            if json {
                let listing: Vec<_> = entries
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "name": e.name,
                            "is_directory": e.is_directory,
                            "size": e.size,
                            "mtime": e.mtime,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for e in entries {
                    let kind = if e.is_directory { "d" } else { "-" };
                    let mtime = from_unix_seconds(e.mtime);
                    println!("{kind} {:>10}  {:?}  {}", e.size, mtime, e.name);
                }
            }
        }
    }
    Ok(())
}
