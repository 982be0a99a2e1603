//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! CLI for bulk object-storage operations.
//!
//! Examples:
//! ```bash
//! s3bulk-cli upload-dir   ./photos  s3://media/archive/2024 --exclude '\.tmp$'
//! s3bulk-cli download-all s3://media/archive/ ./restore -j 32 --progress
//! s3bulk-cli copy-all     s3://media/archive/ s3://backup/media --storage-class cold_instant
//! s3bulk-cli delete-all   s3://scratch/tmp/ --include '\.log$'
//!
//! # Local filesystem instead of S3: buckets are directories under the root
//! s3bulk-cli --fs-root /srv/objects delete-all scratch/tmp/
//! ```

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use s3bulk::{
    BarProgress, BatchConfig, BatchResult, BulkClient, CopyAllOptions, CopyPath, DeleteAllOptions,
    DownloadAllOptions, FileSystemObjectStore, FilterOptions, ObjectStore, S3ObjectStore,
    UploadDirOptions,
};

/// Macro to safely print with broken pipe handling
macro_rules! safe_println {
    ($($arg:tt)*) => {
        match writeln!(io::stdout(), $($arg)*) {
            Ok(_) => {},
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                std::process::exit(0);
            }
            Err(e) => return Err(e.into())
        }
    };
}

/// `bucket[/prefix]`, with or without a leading `s3://`.
#[derive(Clone, Debug)]
struct Target {
    bucket: String,
    prefix: String,
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("s3://").unwrap_or(s);
        let (bucket, prefix) = trimmed.split_once('/').unwrap_or((trimmed, ""));
        if bucket.is_empty() {
            bail!("missing bucket name in {:?}", s);
        }
        Ok(Target {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
        })
    }
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    /// Use the local filesystem under DIR instead of S3.
    #[arg(long = "fs-root", value_name = "DIR", global = true)]
    fs_root: Option<PathBuf>,

    /// Maximum requests in flight (default: S3BULK_MAX_PARALLEL or 10).
    #[arg(short = 'j', long = "jobs", global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug, Clone)]
struct BatchArgs {
    /// Only process keys matching this regex. Repeatable; any match qualifies.
    #[arg(long = "include", value_name = "REGEX")]
    include: Vec<String>,

    /// Skip keys matching this regex. Repeatable.
    #[arg(long = "exclude", value_name = "REGEX")]
    exclude: Vec<String>,

    /// Items per batch (default: S3BULK_BATCH_SIZE or 1000).
    #[arg(long = "batch-size")]
    batch_size: Option<i64>,

    /// Show a progress bar on stderr.
    #[arg(long)]
    progress: bool,
}

impl BatchArgs {
    fn filter(&self) -> Option<Vec<FilterOptions>> {
        if self.include.is_empty() && self.exclude.is_empty() {
            return None;
        }
        Some(vec![FilterOptions {
            include: any_of(&self.include),
            exclude: any_of(&self.exclude),
        }])
    }
}

fn any_of(patterns: &[String]) -> Option<String> {
    match patterns {
        [] => None,
        [one] => Some(one.clone()),
        many => Some(
            many.iter()
                .map(|p| format!("(?:{})", p))
                .collect::<Vec<_>>()
                .join("|"),
        ),
    }
}

#[derive(Subcommand)]
enum Command {
    /// Upload a local directory tree.
    UploadDir {
        source: PathBuf,
        /// Destination bucket[/prefix]
        dest: Target,
        /// Only upload files directly inside SOURCE.
        #[arg(long)]
        shallow: bool,
        #[arg(long = "storage-class")]
        storage_class: Option<String>,
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Download every object under a prefix.
    DownloadAll {
        /// Source bucket[/prefix]
        source: Target,
        dest: PathBuf,
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Server-side copy of every object under a prefix.
    CopyAll {
        source: Target,
        dest: Target,
        #[arg(long = "storage-class")]
        storage_class: Option<String>,
        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Delete every object under a prefix.
    DeleteAll {
        target: Target,
        #[command(flatten)]
        batch: BatchArgs,
    },
}

impl Command {
    fn batch(&self) -> &BatchArgs {
        match self {
            Command::UploadDir { batch, .. }
            | Command::DownloadAll { batch, .. }
            | Command::CopyAll { batch, .. }
            | Command::DeleteAll { batch, .. } => batch,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Command::UploadDir { .. } => "Uploading",
            Command::DownloadAll { .. } => "Downloading",
            Command::CopyAll { .. } => "Copying",
            Command::DeleteAll { .. } => "Deleting",
        }
    }
}

async fn build_store(fs_root: Option<PathBuf>) -> Result<Arc<dyn ObjectStore>> {
    match fs_root {
        Some(root) => {
            info!("Using filesystem store at {}", root.display());
            Ok(Arc::new(FileSystemObjectStore::new(root)))
        }
        None => Ok(Arc::new(
            S3ObjectStore::from_env().await.context("failed to configure S3 client")?,
        )),
    }
}

fn print_summary(verb: &str, result: &BatchResult, started: Instant) -> Result<()> {
    safe_println!(
        "{} {} object(s), {} failed in {:.2?}{}",
        verb,
        result.success_count,
        result.error_count,
        started.elapsed(),
        if result.cancelled { " (interrupted)" } else { "" }
    );
    for err in &result.errors {
        eprintln!("  FAILED {}", err);
    }
    if result.error_count > 0 {
        bail!("{} item(s) failed", result.error_count);
    }
    if result.cancelled {
        bail!("interrupted before all items were processed");
    }
    Ok(())
}

/// Main CLI function
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = BatchConfig::from_env();
    if let Some(jobs) = cli.jobs {
        config = config.with_max_parallel(jobs);
    }

    let store = build_store(cli.fs_root).await?;
    let mut client = BulkClient::with_config(store, config);
    if cli.cmd.batch().progress {
        client = client.with_progress(Arc::new(BarProgress::new(cli.cmd.label())));
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; letting in-flight requests finish");
                cancel.cancel();
            }
        });
    }

    let started = Instant::now();
    match cli.cmd {
        Command::UploadDir { source, dest, shallow, storage_class, batch } => {
            let result = client
                .upload_dir(
                    &cancel,
                    &dest.bucket,
                    &dest.prefix,
                    &source,
                    UploadDirOptions {
                        shallow,
                        storage_class,
                        batch_size: batch.batch_size,
                        filter: batch.filter(),
                    },
                )
                .await?;
            print_summary("Uploaded", &result, started)?;
        }

        Command::DownloadAll { source, dest, batch } => {
            let result = client
                .download_all(
                    &cancel,
                    &source.bucket,
                    &dest,
                    DownloadAllOptions {
                        prefix: source.prefix.clone(),
                        filter: batch.filter(),
                        batch_size: batch.batch_size,
                    },
                )
                .await?;
            print_summary("Downloaded", &result, started)?;
        }

        Command::CopyAll { source, dest, storage_class, batch } => {
            let result = client
                .copy_all(
                    &cancel,
                    &CopyPath::new(source.bucket, source.prefix),
                    &CopyPath::new(dest.bucket, dest.prefix),
                    CopyAllOptions {
                        filter: batch.filter(),
                        storage_class,
                        batch_size: batch.batch_size,
                    },
                )
                .await?;
            print_summary("Copied", &result, started)?;
        }

        Command::DeleteAll { target, batch } => {
            let result = client
                .delete_all(
                    &cancel,
                    &target.bucket,
                    DeleteAllOptions {
                        object_key_prefix: target.prefix.clone(),
                        filter: batch.filter(),
                        batch_size: batch.batch_size,
                    },
                )
                .await?;
            print_summary("Deleted", &result, started)?;
        }
    }

    Ok(())
}
